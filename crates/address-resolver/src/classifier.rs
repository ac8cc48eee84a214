//! Distance zone classifier
//!
//! ```text
//! [0, t1] -> z1,  (t1, t2] -> z2,  ...,  (tn, inf) -> far,  inf | NaN -> unclassified
//! ```

use crate::{ResolverError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_NEAR_KM: f64 = 5.0;
pub const DEFAULT_MID_KM: f64 = 15.0;
pub const DEFAULT_FAR_ZONE: &str = "far";
pub const DEFAULT_UNCLASSIFIED_ZONE: &str = "unclassified";

/// Upper bound (inclusive) of one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneThreshold {
    pub max_km: f64,
    pub zone: String,
    /// Display label for reports ("Proche", "Moyen", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ZoneThreshold {
    pub fn new(max_km: f64, zone: &str) -> Self {
        Self {
            max_km,
            zone: zone.to_string(),
            label: None,
        }
    }
}

pub fn default_thresholds() -> Vec<ZoneThreshold> {
    vec![
        ZoneThreshold::new(DEFAULT_NEAR_KM, "near"),
        ZoneThreshold::new(DEFAULT_MID_KM, "mid"),
    ]
}

/// Validated, ordered zone partition of `[0, inf)`
#[derive(Debug, Clone)]
pub struct ZoneClassifier {
    thresholds: Vec<ZoneThreshold>,
    far_zone: String,
    unclassified_zone: String,
}

impl Default for ZoneClassifier {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            far_zone: DEFAULT_FAR_ZONE.to_string(),
            unclassified_zone: DEFAULT_UNCLASSIFIED_ZONE.to_string(),
        }
    }
}

impl ZoneClassifier {
    /// Thresholds must be finite, positive and strictly increasing; zone
    /// names must be non-empty and distinct (far and unclassified included).
    pub fn new(thresholds: Vec<ZoneThreshold>, far_zone: &str, unclassified_zone: &str) -> Result<Self> {
        if thresholds.is_empty() {
            return Err(ResolverError::Config("at least one zone threshold is required".into()));
        }

        let mut previous = 0.0;
        for t in &thresholds {
            if !t.max_km.is_finite() || t.max_km <= previous {
                return Err(ResolverError::Config(format!(
                    "zone '{}' threshold {} km must be finite and greater than {} km",
                    t.zone, t.max_km, previous
                )));
            }
            previous = t.max_km;
        }

        let mut seen = HashSet::new();
        let names = thresholds
            .iter()
            .map(|t| t.zone.as_str())
            .chain([far_zone, unclassified_zone]);
        for name in names {
            if name.trim().is_empty() {
                return Err(ResolverError::Config("zone names must not be empty".into()));
            }
            if !seen.insert(name) {
                return Err(ResolverError::Config(format!("duplicate zone name '{}'", name)));
            }
        }

        Ok(Self {
            thresholds,
            far_zone: far_zone.to_string(),
            unclassified_zone: unclassified_zone.to_string(),
        })
    }

    pub fn classify(&self, distance_km: f64) -> &str {
        if distance_km.is_nan() || distance_km == f64::INFINITY {
            return &self.unclassified_zone;
        }
        let d = distance_km.max(0.0);
        self.thresholds
            .iter()
            .find(|t| d <= t.max_km)
            .map(|t| t.zone.as_str())
            .unwrap_or(self.far_zone.as_str())
    }

    pub fn thresholds(&self) -> &[ZoneThreshold] {
        &self.thresholds
    }

    pub fn far_zone(&self) -> &str {
        &self.far_zone
    }

    pub fn unclassified_zone(&self) -> &str {
        &self.unclassified_zone
    }

    /// Every zone name in order, unclassified last
    pub fn zone_names(&self) -> Vec<&str> {
        self.thresholds
            .iter()
            .map(|t| t.zone.as_str())
            .chain([self.far_zone.as_str(), self.unclassified_zone.as_str()])
            .collect()
    }
}
