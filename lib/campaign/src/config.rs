//! Campaign workflow configuration.

use serde::Deserialize;

/// Tunables for the campaign graph. `Default` matches the demo dataset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CampaignConfig {
    /// Number of customer segments the clustering produces.
    pub n_clusters: usize,
    /// Source table with raw customer records.
    pub customer_table: String,
    /// Source table with enriched, categorized customer records.
    pub enriched_table: String,
    /// Asset-store folder for generated persona images.
    pub asset_folder: String,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            customer_table: "DEMO_SEG_CLIENT".to_string(),
            enriched_table: "DEMO_SEG_CLIENT_ENRICHI_CAT".to_string(),
            asset_folder: "personas".to_string(),
        }
    }
}
