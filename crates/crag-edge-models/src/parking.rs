//! Parking spots near a crag.

use serde::{Deserialize, Serialize};

use crate::Coordinates;
use crate::map::{directions_url, map_url};

/// A parking spot serving a crag.
///
/// `crag_id` is not checked against any crag listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parking {
    /// Unique parking id.
    pub id: String,
    /// Display name, e.g. the road or village it is on.
    pub name: String,
    /// Where to park.
    pub location: Coordinates,
    /// Id of the crag this spot serves.
    pub crag_id: String,
    /// Number of cars, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl Parking {
    /// Map link for this spot.
    #[must_use]
    pub fn map_url(&self) -> String {
        map_url(self.location)
    }

    /// Navigation link to this spot.
    #[must_use]
    pub fn directions_url(&self) -> String {
        directions_url(self.location)
    }
}
