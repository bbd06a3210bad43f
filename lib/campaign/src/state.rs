//! Campaign workflow state and its mergeable update.

use crate::models::{CampaignObjectives, DataTable, Persona};
use oryjin_conversation::Message;
use oryjin_workflow::WorkflowState;
use serde::{Deserialize, Serialize};

/// Accumulated state of one campaign thread.
///
/// `messages` is append-only; the flags at the bottom are computed by the
/// validation steps and read by the routers, never supplied from outside.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignState {
    pub messages: Vec<Message>,
    pub objectives: Option<CampaignObjectives>,
    pub data: Option<DataTable>,
    pub data_enriched: Option<DataTable>,
    pub personas: Vec<Persona>,
    pub stats_summary: Option<String>,
    pub id_choice_segment: Option<usize>,
    pub image_url: Option<String>,
    pub objectives_complete: bool,
    pub segment_selection_valid: bool,
}

/// Partial state produced by a step or supplied on resume.
///
/// `messages` concatenates on merge; every other field replaces the stored
/// value when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignUpdate {
    pub messages: Vec<Message>,
    pub objectives: Option<CampaignObjectives>,
    pub data: Option<DataTable>,
    pub data_enriched: Option<DataTable>,
    pub personas: Option<Vec<Persona>>,
    pub stats_summary: Option<String>,
    pub id_choice_segment: Option<usize>,
    pub image_url: Option<String>,
    pub objectives_complete: Option<bool>,
    pub segment_selection_valid: Option<bool>,
}

impl CampaignUpdate {
    /// An update carrying one user message, the usual shape of a
    /// clarification reply.
    #[must_use]
    pub fn user_message(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(content)],
            ..Self::default()
        }
    }

    /// An update carrying one assistant message.
    #[must_use]
    pub fn assistant_message(content: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(content)],
            ..Self::default()
        }
    }

    /// An update selecting a segment by index, the shape of a
    /// segment-selection reply.
    #[must_use]
    pub fn segment_choice(index: usize) -> Self {
        Self {
            messages: vec![Message::user(index.to_string())],
            id_choice_segment: Some(index),
            ..Self::default()
        }
    }
}

impl WorkflowState for CampaignState {
    type Update = CampaignUpdate;

    fn apply(&mut self, update: CampaignUpdate) {
        self.messages.extend(update.messages);
        if let Some(objectives) = update.objectives {
            self.objectives = Some(objectives);
        }
        if let Some(data) = update.data {
            self.data = Some(data);
        }
        if let Some(data_enriched) = update.data_enriched {
            self.data_enriched = Some(data_enriched);
        }
        if let Some(personas) = update.personas {
            self.personas = personas;
        }
        if let Some(stats_summary) = update.stats_summary {
            self.stats_summary = Some(stats_summary);
        }
        if let Some(id_choice_segment) = update.id_choice_segment {
            self.id_choice_segment = Some(id_choice_segment);
        }
        if let Some(image_url) = update.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(objectives_complete) = update.objectives_complete {
            self.objectives_complete = objectives_complete;
        }
        if let Some(segment_selection_valid) = update.segment_selection_valid {
            self.segment_selection_valid = segment_selection_valid;
        }
    }

    fn interrupt_prompt(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.is_assistant())
            .map(|message| message.content.clone())
    }
}
