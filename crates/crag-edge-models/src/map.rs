//! Map links built from coordinates.
//!
//! Links point at Google Maps' cross-platform URL scheme, which opens the
//! native app on phones and the web map elsewhere.

use url::form_urlencoded;

use crate::Coordinates;

const SEARCH_BASE: &str = "https://www.google.com/maps/search/";
const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/";

/// Link that drops a pin at `coordinates`.
#[must_use]
pub fn map_url(coordinates: Coordinates) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("api", "1")
        .append_pair("query", &coordinates.to_string())
        .finish();
    format!("{SEARCH_BASE}?{query}")
}

/// Link that starts navigation to `coordinates` from the user's location.
#[must_use]
pub fn directions_url(coordinates: Coordinates) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("api", "1")
        .append_pair("destination", &coordinates.to_string())
        .finish();
    format!("{DIRECTIONS_BASE}?{query}")
}
