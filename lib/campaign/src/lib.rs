//! Campaign workflow domain for the Oryjin campaign studio.
//!
//! Builds the conversational campaign workflow on top of the generic
//! engine in `oryjin-workflow`:
//!
//! - **Models**: the campaign brief, tabular data, and persona records
//! - **State**: the per-thread accumulated state and its mergeable update
//! - **Services**: async collaborator interfaces (extraction, clustering,
//!   generation, asset storage, warehouse access)
//! - **Steps**: the ten workflow steps, from objectives collection to
//!   visual persona generation
//! - **Graph**: assembly of steps, loops, and interrupt points

pub mod config;
pub mod graph;
pub mod models;
pub mod services;
pub mod state;
pub mod steps;

pub use config::CampaignConfig;
pub use graph::{
    CampaignServices, build_campaign_graph, campaign_engine, interrupt_points, names,
};
pub use models::{
    CampaignContext, CampaignObjectives, ClusterStats, DataTable, Media, Objective, Persona,
    PersonaDescription,
};
pub use services::{
    AssetStore, ClusteringService, DataSource, ExtractionService, GenerationService,
};
pub use state::{CampaignState, CampaignUpdate};
