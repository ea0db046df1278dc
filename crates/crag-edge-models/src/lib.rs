//! Interchange data models for the climbing-location front end.
//!
//! These are the record shapes the server-rendered pages are built from.
//! They carry no invariants: upstream code constructs them, the UI reads them.
//!
//! - [`BreadcrumbItem`], [`OptionsItem`], [`SearchItem`]: navigation and menus
//! - [`Parking`], [`Zone`]: climbing-area metadata
//! - [`WeatherForecast`], [`WeatherDay`]: Open-Meteo daily forecast mirror
//! - [`map`]: map links built from [`Coordinates`]

#![warn(missing_docs)]

pub mod breadcrumb;
pub mod geo;
pub mod map;
pub mod options;
pub mod parking;
pub mod search;
pub mod weather;
pub mod zone;

pub use breadcrumb::BreadcrumbItem;
pub use geo::Coordinates;
pub use map::{directions_url, map_url};
pub use options::{OptionsCallback, OptionsItem};
pub use parking::Parking;
pub use search::SearchItem;
pub use weather::{WeatherDay, WeatherForecast};
pub use zone::Zone;
