//! Tunisian Gazetteer Library
//!
//! Static lookup tables used to place free-text addresses on the map:
//!
//! | Table | Key | Used by |
//! |-------|-----|---------|
//! | [`ShortGeocodeTable`] | proprietary short code (plus-code style) | short-geocode tier |
//! | [`Gazetteer`] | place-name / street / site pattern | pattern tier |
//! | [`GovernorateTable`] | governorate name and aliases | governorate fallback |
//!
//! Tables are built once (built-in data or a JSON file), validated, and then
//! only read. All matching happens on text folded by [`normalize_text`].

use thiserror::Error;

pub mod builtin;
pub mod gazetteer;
pub mod geo;
pub mod governorate;
pub mod normalize;
pub mod tables;

pub use gazetteer::{Gazetteer, GazetteerEntry, ShortGeocode, ShortGeocodeTable};
pub use geo::{haversine_km, BoundingBox, Coordinate, EARTH_RADIUS_KM, TUNISIA_BOUNDS};
pub use governorate::{GovernorateCentroid, GovernorateTable};
pub use normalize::{normalize_optional, normalize_tag, normalize_text};
pub use tables::ReferenceTables;

#[derive(Error, Debug)]
pub enum GazetteerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Empty pattern in {table} row {row}")]
    EmptyPattern { table: &'static str, row: usize },
    #[error("Duplicate key '{key}' in {table}")]
    Duplicate { table: &'static str, key: String },
    #[error("Invalid coordinate for '{key}': ({latitude}, {longitude})")]
    InvalidCoordinate {
        key: String,
        latitude: f64,
        longitude: f64,
    },
    #[error("Anchor for '{key}' lies outside its bounding zone")]
    AnchorOutsideZone { key: String },
    #[error("Invalid bounding box for '{0}'")]
    InvalidBounds(String),
}

pub type Result<T> = std::result::Result<T, GazetteerError>;
