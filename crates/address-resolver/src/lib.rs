//! Address Resolver
//!
//! Places free-text business addresses on the map and classifies each one by
//! its distance to the nearest branch of a reference network.
//!
//! # Resolution Tiers
//!
//! Tiers are tried in order; the first one producing an in-bounds coordinate wins.
//!
//! | Tier | Source | Confidence | Method tag |
//! |------|--------|------------|------------|
//! | 1 | short-geocode token, exact | 0.98 | `short-geocode-match` |
//! | 2 | gazetteer pattern in address text | 0.88 | `pattern-match` |
//! | 3 | external lookup (optional, well-formed addresses only) | 0.75 | `external-lookup` |
//! | 4 | governorate centroid from region hint or address | 0.65 | `governorate-fallback` |
//! | - | nothing matched | 0.00 | `unresolved` |
//!
//! # Proximity
//!
//! ```text
//! d = min over reference points r of haversine(location, r)
//! zone = first z with d <= max_km(z), else far; d = +inf -> unclassified
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tn_gazetteer::{Coordinate, GazetteerError};

pub mod catchment;
pub mod classifier;
pub mod confidence;
pub mod config;
pub mod export;
pub mod geocoder;
pub mod jitter;
pub mod loader;
pub mod locator;
pub mod matcher;
#[cfg(feature = "nominatim")]
pub mod nominatim;
pub mod pipeline;

pub use catchment::{Catchment, CatchmentClassifier};
pub use classifier::{ZoneClassifier, ZoneThreshold};
pub use confidence::{ConfidenceBand, ConfidenceScale};
pub use config::EngineConfig;
pub use geocoder::{ExternalGeocoder, LookupError};
pub use locator::{NearestReference, NearestReferenceLocator, ReferencePoint};
pub use matcher::{AddressMatcher, Tier, TierMatch};
pub use pipeline::ResolutionPipeline;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Reference table error: {0}")]
    Gazetteer(#[from] GazetteerError),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Unsupported input: {0}")]
    InputFormat(String),
}

pub type Result<T> = std::result::Result<T, ResolverError>;

/// One business record to place on the map. Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressableEntity {
    pub id: String,
    #[serde(default)]
    pub raw_address: Option<String>,
    #[serde(default)]
    pub region_hint: Option<String>,
    #[serde(default)]
    pub short_geocode_token: Option<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Delegation (sub-governorate district), scanned together with the address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegation: Option<String>,
}

impl AddressableEntity {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.raw_address = Some(address.to_string());
        self
    }

    pub fn with_region_hint(mut self, hint: &str) -> Self {
        self.region_hint = Some(hint.to_string());
        self
    }

    pub fn with_short_geocode(mut self, token: &str) -> Self {
        self.short_geocode_token = Some(token.to_string());
        self
    }

    pub fn with_delegation(mut self, delegation: &str) -> Self {
        self.delegation = Some(delegation.to_string());
        self
    }
}

/// Which tier produced a resolved coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    ShortGeocodeMatch,
    PatternMatch,
    ExternalLookup,
    GovernorateFallback,
    Unresolved,
}

impl ResolutionMethod {
    /// Tier priority order
    pub const ALL: [ResolutionMethod; 5] = [
        Self::ShortGeocodeMatch,
        Self::PatternMatch,
        Self::ExternalLookup,
        Self::GovernorateFallback,
        Self::Unresolved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortGeocodeMatch => "short-geocode-match",
            Self::PatternMatch => "pattern-match",
            Self::ExternalLookup => "external-lookup",
            Self::GovernorateFallback => "governorate-fallback",
            Self::Unresolved => "unresolved",
        }
    }
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine output for one entity: the input fields plus location and proximity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    #[serde(flatten)]
    pub entity: AddressableEntity,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// 0.0 iff no coordinate
    pub confidence: f64,
    pub resolution_method: ResolutionMethod,
    /// Pattern, token, governorate name or `external` that produced the match
    pub matched_on: Option<String>,
    pub nearest_reference_id: Option<String>,
    /// `+inf` when there is no coordinate or no reference point
    #[serde(with = "infinite_km")]
    pub distance_km: f64,
    pub zone: String,
    pub catchment: String,
}

impl ResolvedLocation {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution_method != ResolutionMethod::Unresolved
    }
}

/// Serde helper writing `+inf` as the string `"inf"` (JSON has no infinity)
pub mod infinite_km {
    use serde::{Deserialize, Deserializer, Serializer};

    pub const INF_TEXT: &str = "inf";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INF_TEXT)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Km {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Km::deserialize(deserializer)? {
            Km::Number(v) => Ok(v),
            Km::Text(s) => parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid distance '{}'", s))),
        }
    }

    /// Parse a distance cell: a number or `inf`/`infinity` (any case)
    pub fn parse(s: &str) -> Option<f64> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
            _ => s.parse::<f64>().ok(),
        }
    }

    pub fn format(value: f64) -> String {
        if value.is_infinite() && value.is_sign_positive() {
            INF_TEXT.to_string()
        } else {
            value.to_string()
        }
    }
}
