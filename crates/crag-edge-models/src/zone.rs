//! Climbing zones: named groups of crags.

use serde::{Deserialize, Serialize};

/// A climbing zone.
///
/// The slug fields link the zone to its page on external guidebook sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Unique zone id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text introduction to the zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ids of the crags in this zone
    #[serde(default)]
    pub crags: Vec<String>,
    /// Slug on thecrag.com
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub the_crag_slug: Option<String>,
    /// Slug on 27crags.com
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twenty_seven_crags_slug: Option<String>,
}

impl Zone {
    /// Whether `crag_id` is listed in this zone.
    pub fn contains_crag(&self, crag_id: &str) -> bool {
        self.crags.iter().any(|id| id == crag_id)
    }
}
