//! Campaign graph assembly.
//!
//! Wires the ten campaign steps into the workflow graph: the objectives
//! clarification loop, the linear data/clustering spine, and the
//! segment-selection loop, ending at visual persona generation.

use crate::config::CampaignConfig;
use crate::services::{
    AssetStore, ClusteringService, DataSource, ExtractionService, GenerationService,
};
use crate::state::CampaignState;
use crate::steps::{
    CollectCampaignObjectives, CollectData, EnrichData, GenerateTextualPersonas,
    GenerateVisualPersona, PerformClustering, ValidateCampaignObjectives,
    ValidateSegmentSelection,
};
use oryjin_workflow::{
    Engine, GraphError, InMemoryThreadStore, MarkerStep, StepName, WorkflowGraph,
};
use std::sync::Arc;

/// Step names of the campaign workflow.
pub mod names {
    pub const COLLECT_CAMPAIGN_OBJECTIVES: &str = "collect_campaign_objectives";
    pub const VALIDATE_CAMPAIGN_OBJECTIVES: &str = "validate_campaign_objectives";
    pub const AWAIT_USER_CLARIFICATION: &str = "await_user_clarification";
    pub const COLLECT_DATA: &str = "collect_data";
    pub const ENRICH_DATA: &str = "enrich_data";
    pub const PERFORM_CLUSTERING: &str = "perform_clustering";
    pub const GENERATE_TEXTUAL_PERSONAS: &str = "generate_textual_personas";
    pub const VALIDATE_SEGMENT_SELECTION: &str = "validate_segment_selection";
    pub const AWAIT_SEGMENT_SELECTION: &str = "await_segment_selection";
    pub const GENERATE_VISUAL_PERSONA: &str = "generate_visual_persona";
}

/// The collaborators a campaign graph is assembled from.
#[derive(Clone)]
pub struct CampaignServices {
    pub extraction: Arc<dyn ExtractionService>,
    pub clustering: Arc<dyn ClusteringService>,
    pub generation: Arc<dyn GenerationService>,
    pub assets: Arc<dyn AssetStore>,
    pub data: Arc<dyn DataSource>,
}

/// The steps the engine must pause before, waiting for human input.
#[must_use]
pub fn interrupt_points() -> [&'static str; 2] {
    [names::AWAIT_USER_CLARIFICATION, names::AWAIT_SEGMENT_SELECTION]
}

/// Builds the campaign workflow graph.
///
/// # Errors
///
/// Returns `GraphError` if the wiring is inconsistent; with this fixed
/// step set that indicates a programming error.
pub fn build_campaign_graph(
    services: &CampaignServices,
    config: &CampaignConfig,
) -> Result<WorkflowGraph<CampaignState>, GraphError> {
    WorkflowGraph::builder()
        .step(
            names::COLLECT_CAMPAIGN_OBJECTIVES,
            CollectCampaignObjectives {
                extraction: Arc::clone(&services.extraction),
            },
        )
        .step(
            names::VALIDATE_CAMPAIGN_OBJECTIVES,
            ValidateCampaignObjectives,
        )
        .step(names::AWAIT_USER_CLARIFICATION, MarkerStep)
        .step(
            names::COLLECT_DATA,
            CollectData {
                source: Arc::clone(&services.data),
                table: config.customer_table.clone(),
            },
        )
        .step(
            names::ENRICH_DATA,
            EnrichData {
                source: Arc::clone(&services.data),
                table: config.enriched_table.clone(),
            },
        )
        .step(
            names::PERFORM_CLUSTERING,
            PerformClustering {
                clustering: Arc::clone(&services.clustering),
                extraction: Arc::clone(&services.extraction),
                n_clusters: config.n_clusters,
            },
        )
        .step(
            names::GENERATE_TEXTUAL_PERSONAS,
            GenerateTextualPersonas {
                extraction: Arc::clone(&services.extraction),
            },
        )
        .step(names::VALIDATE_SEGMENT_SELECTION, ValidateSegmentSelection)
        .step(names::AWAIT_SEGMENT_SELECTION, MarkerStep)
        .step(
            names::GENERATE_VISUAL_PERSONA,
            GenerateVisualPersona {
                generation: Arc::clone(&services.generation),
                assets: Arc::clone(&services.assets),
                folder: config.asset_folder.clone(),
            },
        )
        .start(names::COLLECT_CAMPAIGN_OBJECTIVES)
        .edge(
            names::COLLECT_CAMPAIGN_OBJECTIVES,
            names::VALIDATE_CAMPAIGN_OBJECTIVES,
        )
        .conditional(
            names::VALIDATE_CAMPAIGN_OBJECTIVES,
            [names::COLLECT_DATA, names::AWAIT_USER_CLARIFICATION],
            |state: &CampaignState| {
                if state.objectives_complete {
                    StepName::from(names::COLLECT_DATA)
                } else {
                    StepName::from(names::AWAIT_USER_CLARIFICATION)
                }
            },
        )
        .edge(
            names::AWAIT_USER_CLARIFICATION,
            names::COLLECT_CAMPAIGN_OBJECTIVES,
        )
        .edge(names::COLLECT_DATA, names::ENRICH_DATA)
        .edge(names::ENRICH_DATA, names::PERFORM_CLUSTERING)
        .edge(names::PERFORM_CLUSTERING, names::GENERATE_TEXTUAL_PERSONAS)
        .edge(
            names::GENERATE_TEXTUAL_PERSONAS,
            names::VALIDATE_SEGMENT_SELECTION,
        )
        .conditional(
            names::VALIDATE_SEGMENT_SELECTION,
            [
                names::GENERATE_VISUAL_PERSONA,
                names::AWAIT_SEGMENT_SELECTION,
            ],
            |state: &CampaignState| {
                if state.segment_selection_valid {
                    StepName::from(names::GENERATE_VISUAL_PERSONA)
                } else {
                    StepName::from(names::AWAIT_SEGMENT_SELECTION)
                }
            },
        )
        .edge(
            names::AWAIT_SEGMENT_SELECTION,
            names::VALIDATE_SEGMENT_SELECTION,
        )
        .terminal(names::GENERATE_VISUAL_PERSONA)
        .build()
}

/// Builds a ready-to-run engine over an in-memory thread store.
///
/// # Errors
///
/// Propagates `GraphError` from [`build_campaign_graph`].
pub fn campaign_engine(
    services: &CampaignServices,
    config: &CampaignConfig,
) -> Result<Engine<CampaignState, InMemoryThreadStore<CampaignState>>, GraphError> {
    let graph = build_campaign_graph(services, config)?;
    Ok(Engine::new(graph, InMemoryThreadStore::new()).with_interrupt_before(interrupt_points()))
}
