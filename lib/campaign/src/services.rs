//! Collaborator interfaces.
//!
//! The workflow never talks to an LLM vendor, a warehouse, or a blob store
//! directly. Each concern is an async trait object injected at graph
//! assembly; failures surface as [`CollaboratorError`] and leave the thread
//! retryable.

use crate::models::{
    CampaignObjectives, ClusterStats, DataTable, Persona, PersonaDescription,
};
use async_trait::async_trait;
use oryjin_conversation::Message;
use oryjin_workflow::CollaboratorError;

/// Structured extraction over conversations and cluster statistics.
///
/// Implementations must never fabricate values absent from the input: an
/// unanswered brief field stays `None`.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    /// Extracts the campaign brief from the conversation so far,
    /// incrementally refining `existing` when present.
    async fn extract_objectives(
        &self,
        messages: &[Message],
        existing: Option<&CampaignObjectives>,
    ) -> Result<CampaignObjectives, CollaboratorError>;

    /// Turns per-cluster attribute means into persona records.
    async fn extract_personas(
        &self,
        stats: &ClusterStats,
    ) -> Result<Vec<Persona>, CollaboratorError>;

    /// Writes a marketing description for each persona.
    async fn describe_personas(
        &self,
        personas: &[Persona],
    ) -> Result<Vec<PersonaDescription>, CollaboratorError>;
}

/// Segmentation of a customer table into `k` clusters.
///
/// Implementations must be deterministic for the same inputs so a retried
/// step reproduces its previous result.
#[async_trait]
pub trait ClusteringService: Send + Sync {
    async fn cluster(&self, table: &DataTable, k: usize)
    -> Result<ClusterStats, CollaboratorError>;
}

/// Free-form text and image generation.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, CollaboratorError>;

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, CollaboratorError>;
}

/// Blob storage for generated assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Uploads `bytes` under `path` and returns the public URL.
    async fn upload(&self, bytes: Vec<u8>, path: &str) -> Result<String, CollaboratorError>;
}

/// Read access to the customer data warehouse.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, table_name: &str) -> Result<DataTable, CollaboratorError>;
}
