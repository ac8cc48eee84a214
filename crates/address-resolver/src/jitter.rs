//! Deterministic marker jitter
//!
//! Entities resolved onto the same anchor would stack on the map. Each one is
//! nudged by an offset derived from SHA-256 of its identity, so the same
//! entity always lands on the same spot.

use crate::{ResolutionMethod, ResolverError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tn_gazetteer::{BoundingBox, Coordinate};

/// Half-widths of the jitter square, in degrees, per tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub pattern_deg: f64,
    pub governorate_deg: f64,
    pub short_geocode_deg: f64,
    pub external_lookup_deg: f64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            pattern_deg: 0.0003,
            governorate_deg: 0.001,
            short_geocode_deg: 0.0,
            external_lookup_deg: 0.0,
        }
    }
}

impl JitterConfig {
    /// No jitter on any tier
    pub fn none() -> Self {
        Self {
            pattern_deg: 0.0,
            governorate_deg: 0.0,
            short_geocode_deg: 0.0,
            external_lookup_deg: 0.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, r) in [
            ("pattern_deg", self.pattern_deg),
            ("governorate_deg", self.governorate_deg),
            ("short_geocode_deg", self.short_geocode_deg),
            ("external_lookup_deg", self.external_lookup_deg),
        ] {
            if !r.is_finite() || r < 0.0 {
                return Err(ResolverError::Config(format!(
                    "jitter.{} must be finite and non-negative, got {}",
                    name, r
                )));
            }
        }
        Ok(())
    }

    pub fn radius(&self, method: ResolutionMethod) -> f64 {
        match method {
            ResolutionMethod::ShortGeocodeMatch => self.short_geocode_deg,
            ResolutionMethod::PatternMatch => self.pattern_deg,
            ResolutionMethod::ExternalLookup => self.external_lookup_deg,
            ResolutionMethod::GovernorateFallback => self.governorate_deg,
            ResolutionMethod::Unresolved => 0.0,
        }
    }
}

/// Two offsets in `[-1, 1]` seeded by `id ␀ normalized_address`
pub fn unit_offsets(id: &str, normalized_address: &str) -> (f64, f64) {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized_address.as_bytes());
    let digest = hasher.finalize();

    let to_unit = |bytes: &[u8]| {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        let v = u64::from_be_bytes(buf) as f64 / u64::MAX as f64;
        (v * 2.0 - 1.0).clamp(-1.0, 1.0)
    };
    (to_unit(&digest[0..8]), to_unit(&digest[8..16]))
}

/// Offset `anchor` by up to `radius_deg` on each axis, then clamp into the
/// entry's zone (if any) and the national box.
pub fn apply(
    anchor: Coordinate,
    radius_deg: f64,
    id: &str,
    normalized_address: &str,
    zone: Option<&BoundingBox>,
    bounds: &BoundingBox,
) -> Coordinate {
    if radius_deg <= 0.0 {
        return anchor;
    }

    let (u, v) = unit_offsets(id, normalized_address);
    let mut c = anchor.offset(u * radius_deg, v * radius_deg);
    if let Some(zone) = zone {
        c = zone.clamp(&c);
    }
    bounds.clamp(&c)
}
