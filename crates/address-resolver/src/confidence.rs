//! Confidence scale: one fixed value per resolution tier

use crate::{ResolutionMethod, ResolverError, Result};
use serde::{Deserialize, Serialize};

pub const SHORT_GEOCODE_CONFIDENCE: f64 = 0.98;
pub const PATTERN_CONFIDENCE: f64 = 0.88;
pub const EXTERNAL_LOOKUP_CONFIDENCE: f64 = 0.75;
pub const GOVERNORATE_CONFIDENCE: f64 = 0.65;

/// Lower bounds of the reporting bands
pub const HIGH_BAND_MIN: f64 = 0.8;
pub const MEDIUM_BAND_MIN: f64 = 0.6;

/// Per-tier confidence values.
///
/// Must stay in `(0, 1]` and strictly decrease in tier order so that a
/// higher tier always reports more confidence than a lower one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceScale {
    pub short_geocode: f64,
    pub pattern: f64,
    pub external_lookup: f64,
    pub governorate: f64,
}

impl Default for ConfidenceScale {
    fn default() -> Self {
        Self {
            short_geocode: SHORT_GEOCODE_CONFIDENCE,
            pattern: PATTERN_CONFIDENCE,
            external_lookup: EXTERNAL_LOOKUP_CONFIDENCE,
            governorate: GOVERNORATE_CONFIDENCE,
        }
    }
}

impl ConfidenceScale {
    pub fn validate(&self) -> Result<()> {
        let ordered = [
            ("short_geocode", self.short_geocode),
            ("pattern", self.pattern),
            ("external_lookup", self.external_lookup),
            ("governorate", self.governorate),
        ];
        for (name, value) in ordered {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ResolverError::Config(format!(
                    "confidence.{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        for pair in ordered.windows(2) {
            let ((hi_name, hi), (lo_name, lo)) = (pair[0], pair[1]);
            if lo >= hi {
                return Err(ResolverError::Config(format!(
                    "confidence.{} ({}) must be below confidence.{} ({})",
                    lo_name, lo, hi_name, hi
                )));
            }
        }
        Ok(())
    }

    pub fn score(&self, method: ResolutionMethod) -> f64 {
        match method {
            ResolutionMethod::ShortGeocodeMatch => self.short_geocode,
            ResolutionMethod::PatternMatch => self.pattern,
            ResolutionMethod::ExternalLookup => self.external_lookup,
            ResolutionMethod::GovernorateFallback => self.governorate,
            ResolutionMethod::Unresolved => 0.0,
        }
    }
}

/// Reporting band for a confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn of(confidence: f64) -> Self {
        if confidence >= HIGH_BAND_MIN {
            Self::High
        } else if confidence >= MEDIUM_BAND_MIN {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}
