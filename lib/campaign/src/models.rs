//! Campaign domain records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Campaign objective category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Awareness,
    Acquisition,
    Sales,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Awareness => "awareness",
            Self::Acquisition => "acquisition",
            Self::Sales => "sales",
        };
        f.write_str(label)
    }
}

/// Media channel for the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Media {
    Display,
    Video,
    Social,
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Display => "display",
            Self::Video => "video",
            Self::Social => "social",
        };
        f.write_str(label)
    }
}

/// Free-text campaign context. Each field stays unset until the
/// conversation supplies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignContext {
    pub end_target: Option<String>,
    pub business_context: Option<String>,
    pub product_context: Option<String>,
}

/// The campaign brief extracted from the conversation so far.
///
/// Every field is optional: extraction records only what the user actually
/// said, and validation drives the clarification loop off the gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignObjectives {
    pub objective: Option<Objective>,
    pub media: Option<Media>,
    #[serde(default)]
    pub context: CampaignContext,
}

impl CampaignObjectives {
    /// Dotted paths of every unset field, in declaration order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.objective.is_none() {
            missing.push("objective".to_string());
        }
        if self.media.is_none() {
            missing.push("media".to_string());
        }
        if self.context.end_target.is_none() {
            missing.push("context.end_target".to_string());
        }
        if self.context.business_context.is_none() {
            missing.push("context.business_context".to_string());
        }
        if self.context.product_context.is_none() {
            missing.push("context.product_context".to_string());
        }
        missing
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Multi-line summary of the brief, with `-` standing in for unset
    /// fields. Used in the conversation-facing status messages.
    #[must_use]
    pub fn summary(&self) -> String {
        fn show<T: fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string)
        }

        format!(
            "Objective: {}\nMedia: {}\nContext:\n- Target: {}\n- Business: {}\n- Product: {}",
            show(&self.objective),
            show(&self.media),
            show(&self.context.end_target),
            show(&self.context.business_context),
            show(&self.context.product_context),
        )
    }
}

/// Opaque tabular payload fetched from the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl DataTable {
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Per-cluster attribute means, keyed by cluster id.
pub type ClusterStats = BTreeMap<u32, BTreeMap<String, f64>>;

/// One customer segment: its cluster id, the numeric attribute means the
/// clustering produced, and the marketing description filled in later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub cluster: u32,
    pub attributes: BTreeMap<String, f64>,
    pub description: Option<String>,
}

/// A generated description for one cluster, as returned by extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaDescription {
    pub cluster: u32,
    pub description: String,
}
