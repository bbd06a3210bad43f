//! Campaign workflow steps.
//!
//! Each step is pure with respect to the state it receives: it reads what
//! it needs, calls its collaborators, and returns an update. Validation
//! steps never call out and never fail; their job is to set a router flag
//! and append the message that explains it.

use crate::models::Persona;
use crate::services::{
    AssetStore, ClusteringService, DataSource, ExtractionService, GenerationService,
};
use crate::state::{CampaignState, CampaignUpdate};
use async_trait::async_trait;
use oryjin_conversation::Message;
use oryjin_workflow::{CollaboratorError, Step};
use std::collections::BTreeMap;
use std::sync::Arc;

fn missing_input(service: &str, what: &str) -> CollaboratorError {
    CollaboratorError::new(service, format!("required input not in state: {what}"))
}

/// Extracts the campaign brief from the conversation, refining whatever
/// was extracted on previous passes through the clarification loop.
pub struct CollectCampaignObjectives {
    pub extraction: Arc<dyn ExtractionService>,
}

#[async_trait]
impl Step<CampaignState> for CollectCampaignObjectives {
    async fn run(&self, state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        let objectives = self
            .extraction
            .extract_objectives(&state.messages, state.objectives.as_ref())
            .await?;
        Ok(CampaignUpdate {
            objectives: Some(objectives),
            ..CampaignUpdate::default()
        })
    }
}

/// Checks the brief for gaps and sets the router flag. Incomplete briefs
/// get a clarification request; complete ones a confirmation summary.
pub struct ValidateCampaignObjectives;

#[async_trait]
impl Step<CampaignState> for ValidateCampaignObjectives {
    async fn run(&self, state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        let objectives = state.objectives.clone().unwrap_or_default();
        let missing = objectives.missing_fields();

        let (message, complete) = if missing.is_empty() {
            (
                format!("Campaign objectives collected:\n{}", objectives.summary()),
                true,
            )
        } else {
            (
                format!(
                    "Campaign brief so far:\n{}\n\nTo continue, please provide: {}",
                    objectives.summary(),
                    missing.join(", ")
                ),
                false,
            )
        };

        Ok(CampaignUpdate {
            messages: vec![Message::assistant(message)],
            objectives_complete: Some(complete),
            ..CampaignUpdate::default()
        })
    }
}

/// Fetches the raw customer table.
pub struct CollectData {
    pub source: Arc<dyn DataSource>,
    pub table: String,
}

#[async_trait]
impl Step<CampaignState> for CollectData {
    async fn run(&self, _state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        let data = self.source.fetch(&self.table).await?;
        let message = format!(
            "Customer data collected ({} rows from {}).",
            data.row_count(),
            self.table
        );
        Ok(CampaignUpdate {
            messages: vec![Message::assistant(message)],
            data: Some(data),
            ..CampaignUpdate::default()
        })
    }
}

/// Fetches the enriched, categorized customer table.
pub struct EnrichData {
    pub source: Arc<dyn DataSource>,
    pub table: String,
}

#[async_trait]
impl Step<CampaignState> for EnrichData {
    async fn run(&self, _state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        let data_enriched = self.source.fetch(&self.table).await?;
        let message = format!(
            "Customer data enriched ({} rows from {}).",
            data_enriched.row_count(),
            self.table
        );
        Ok(CampaignUpdate {
            messages: vec![Message::assistant(message)],
            data_enriched: Some(data_enriched),
            ..CampaignUpdate::default()
        })
    }
}

/// Clusters the enriched table into segments and extracts one persona per
/// cluster, then posts the formatted statistics to the conversation.
pub struct PerformClustering {
    pub clustering: Arc<dyn ClusteringService>,
    pub extraction: Arc<dyn ExtractionService>,
    pub n_clusters: usize,
}

#[async_trait]
impl Step<CampaignState> for PerformClustering {
    async fn run(&self, state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        let table = state
            .data_enriched
            .as_ref()
            .ok_or_else(|| missing_input("clustering", "enriched customer data"))?;

        let stats = self.clustering.cluster(table, self.n_clusters).await?;
        tracing::debug!(clusters = stats.len(), "clustering complete");
        let personas = self.extraction.extract_personas(&stats).await?;
        let summary = format_cluster_stats(&personas);

        Ok(CampaignUpdate {
            messages: vec![Message::assistant(summary.clone())],
            personas: Some(personas),
            stats_summary: Some(summary),
            ..CampaignUpdate::default()
        })
    }
}

fn format_cluster_stats(personas: &[Persona]) -> String {
    let mut lines = vec!["Cluster statistics:".to_string()];
    for persona in personas {
        lines.push(format!("Segment {}:", persona.cluster));
        for (attribute, mean) in &persona.attributes {
            lines.push(format!("  {attribute}: {mean:.2}"));
        }
    }
    lines.join("\n")
}

/// Writes a marketing description for each persona, copy-on-write over the
/// stored records.
pub struct GenerateTextualPersonas {
    pub extraction: Arc<dyn ExtractionService>,
}

#[async_trait]
impl Step<CampaignState> for GenerateTextualPersonas {
    async fn run(&self, state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        if state.personas.is_empty() {
            return Err(missing_input("extraction", "clustered personas"));
        }

        let descriptions = self.extraction.describe_personas(&state.personas).await?;
        let by_cluster: BTreeMap<u32, String> = descriptions
            .into_iter()
            .map(|d| (d.cluster, d.description))
            .collect();

        let personas: Vec<Persona> = state
            .personas
            .iter()
            .map(|persona| Persona {
                description: by_cluster
                    .get(&persona.cluster)
                    .cloned()
                    .or_else(|| persona.description.clone()),
                ..persona.clone()
            })
            .collect();

        let summary = personas
            .iter()
            .map(|p| {
                format!(
                    "Segment {}:\n{}",
                    p.cluster,
                    p.description.as_deref().unwrap_or("(no description)")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(CampaignUpdate {
            messages: vec![Message::assistant(format!(
                "Textual personas generated:\n{summary}"
            ))],
            personas: Some(personas),
            ..CampaignUpdate::default()
        })
    }
}

/// Checks the user's segment choice. No choice yet yields the selection
/// menu; an out-of-range index an error message; both loop back for input.
pub struct ValidateSegmentSelection;

#[async_trait]
impl Step<CampaignState> for ValidateSegmentSelection {
    async fn run(&self, state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        let (message, valid) = match state.id_choice_segment {
            None => (segment_menu(&state.personas), false),
            Some(index) if index >= state.personas.len() => (
                format!(
                    "Segment index {index} is invalid: choose an index between 0 and {}.",
                    state.personas.len().saturating_sub(1)
                ),
                false,
            ),
            Some(index) => (
                format!(
                    "You selected segment {}. Continuing.",
                    state.personas[index].cluster
                ),
                true,
            ),
        };

        Ok(CampaignUpdate {
            messages: vec![Message::assistant(message)],
            segment_selection_valid: Some(valid),
            ..CampaignUpdate::default()
        })
    }
}

fn segment_menu(personas: &[Persona]) -> String {
    let mut lines = vec!["Select a segment by index:".to_string()];
    for (index, persona) in personas.iter().enumerate() {
        let label = persona
            .description
            .as_deref()
            .and_then(|d| d.lines().next())
            .unwrap_or("(no description)");
        lines.push(format!("{index}: Segment {} - {label}", persona.cluster));
    }
    lines.join("\n")
}

/// Generates the visual persona for the chosen segment: an image brief via
/// text generation, the image itself, and an asset upload.
pub struct GenerateVisualPersona {
    pub generation: Arc<dyn GenerationService>,
    pub assets: Arc<dyn AssetStore>,
    pub folder: String,
}

#[async_trait]
impl Step<CampaignState> for GenerateVisualPersona {
    async fn run(&self, state: &CampaignState) -> Result<CampaignUpdate, CollaboratorError> {
        let index = state
            .id_choice_segment
            .ok_or_else(|| missing_input("generation", "validated segment choice"))?;
        let persona = state
            .personas
            .get(index)
            .ok_or_else(|| missing_input("generation", "persona at the chosen index"))?;
        let description = persona
            .description
            .as_deref()
            .ok_or_else(|| missing_input("generation", "persona description"))?;

        let image_prompt = self
            .generation
            .generate_text(&image_brief(description))
            .await?;
        let image = self.generation.generate_image(&image_prompt).await?;
        let path = format!("{}/segment_{}.png", self.folder, persona.cluster);
        let image_url = self.assets.upload(image, &path).await?;
        tracing::debug!(%image_url, "visual persona uploaded");

        let message = format!(
            "Image prompt: {image_prompt}\n---\nPersona description:\n{description}\n---\nGenerated image: {image_url}"
        );

        Ok(CampaignUpdate {
            messages: vec![Message::assistant(message)],
            image_url: Some(image_url),
            ..CampaignUpdate::default()
        })
    }
}

fn image_brief(description: &str) -> String {
    format!(
        "You are an art director. Write a single vivid image-generation prompt \
         portraying the customer persona below in a realistic everyday scene. \
         Describe the person, the setting, and the mood; do not include text \
         overlays or brand names.\n\nPersona:\n{description}"
    )
}
