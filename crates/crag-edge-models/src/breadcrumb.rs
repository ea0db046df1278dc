//! Breadcrumb navigation entries.

use serde::{Deserialize, Serialize};

/// One step in the breadcrumb trail above a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreadcrumbItem {
    /// Text shown for the step
    pub caption: String,
    /// Application route the step links to
    pub router_link: String,
}

impl BreadcrumbItem {
    /// Create a breadcrumb step.
    pub fn new(caption: impl Into<String>, router_link: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            router_link: router_link.into(),
        }
    }
}
