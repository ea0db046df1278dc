//! Search result entries.

use serde::{Deserialize, Serialize};

/// A single hit in the global search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchItem {
    /// Route the hit links to.
    pub href: String,
    /// Main line of the hit.
    pub title: String,
    /// Secondary line, e.g. the zone a crag belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Icon identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}
