//! Engine configuration (JSON), with defaults for every field

use crate::catchment::{
    default_catchments, Catchment, CatchmentClassifier, DEFAULT_INSIDE_LABEL, DEFAULT_UNKNOWN_LABEL,
};
use crate::classifier::{
    default_thresholds, ZoneClassifier, ZoneThreshold, DEFAULT_FAR_ZONE, DEFAULT_UNCLASSIFIED_ZONE,
};
use crate::confidence::ConfidenceScale;
use crate::geocoder::RetryPolicy;
use crate::jitter::JitterConfig;
use crate::{ResolverError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tn_gazetteer::builtin::{LAYER_BUSINESS, LAYER_DISTRICTS, LAYER_MEDICAL_CENTERS, LAYER_STREETS};
use tn_gazetteer::{normalize_tag, normalize_text, BoundingBox, TUNISIA_BOUNDS};
use tracing::info;

pub const NOMINATIM_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
/// Nominatim usage policy: at most one request per second
pub const MIN_LOOKUP_INTERVAL_MS: u64 = 1000;
pub const MAX_LOOKUP_TIMEOUT_SECS: u64 = 60;

/// Gazetteer layers scanned for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub layers: Vec<String>,
}

impl CategoryProfile {
    pub fn new(layers: &[&str]) -> Self {
        Self {
            layers: layers.iter().map(|l| l.to_string()).collect(),
        }
    }
}

pub fn default_profiles() -> BTreeMap<String, CategoryProfile> {
    let business = CategoryProfile::new(&[LAYER_BUSINESS, LAYER_DISTRICTS, LAYER_STREETS]);
    BTreeMap::from([
        (
            "doctor".to_string(),
            CategoryProfile::new(&[LAYER_MEDICAL_CENTERS, LAYER_DISTRICTS, LAYER_STREETS]),
        ),
        (
            "pharmacy".to_string(),
            CategoryProfile::new(&[LAYER_DISTRICTS, LAYER_STREETS]),
        ),
        ("accountant".to_string(), business.clone()),
        ("advisor".to_string(), business),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatchmentConfig {
    pub areas: Vec<Catchment>,
    /// Label for points inside the national box but in no area
    pub inside_label: String,
    /// Label for records without a coordinate
    pub unknown_label: String,
}

impl Default for CatchmentConfig {
    fn default() -> Self {
        Self {
            areas: default_catchments(),
            inside_label: DEFAULT_INSIDE_LABEL.to_string(),
            unknown_label: DEFAULT_UNKNOWN_LABEL.to_string(),
        }
    }
}

/// External lookup tier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalLookupConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub user_agent: String,
    /// Minimum delay between two requests, all threads combined
    pub min_interval_ms: u64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for ExternalLookupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: NOMINATIM_ENDPOINT.to_string(),
            user_agent: format!("address-resolver/{}", env!("CARGO_PKG_VERSION")),
            min_interval_ms: 1100,
            timeout_secs: 10,
            max_retries: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8000,
        }
    }
}

impl ExternalLookupConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(ResolverError::Config("external_lookup.endpoint must not be empty".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ResolverError::Config("external_lookup.user_agent must not be empty".into()));
        }
        if self.min_interval_ms < MIN_LOOKUP_INTERVAL_MS {
            return Err(ResolverError::Config(format!(
                "external_lookup.min_interval_ms must be at least {}, got {}",
                MIN_LOOKUP_INTERVAL_MS, self.min_interval_ms
            )));
        }
        if !(1..=MAX_LOOKUP_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(ResolverError::Config(format!(
                "external_lookup.timeout_secs must be in 1..={}, got {}",
                MAX_LOOKUP_TIMEOUT_SECS, self.timeout_secs
            )));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ResolverError::Config(
                "external_lookup.backoff_base_ms must not exceed backoff_max_ms".into(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
        }
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Everything tunable about a resolution run.
///
/// Validated once by [`EngineConfig::validate`] (called when the pipeline is
/// built); an invalid file stops the run before any entity is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub confidence: ConfidenceScale,
    pub zones: Vec<ZoneThreshold>,
    pub far_zone: String,
    pub unclassified_zone: String,
    /// National sanity box for every accepted coordinate
    pub bounds: BoundingBox,
    pub jitter: JitterConfig,
    /// Category tag -> gazetteer layers
    pub categories: BTreeMap<String, CategoryProfile>,
    /// Only reference points with this network flag are used for proximity
    pub reference_network: Option<String>,
    pub catchments: CatchmentConfig,
    pub external_lookup: ExternalLookupConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence: ConfidenceScale::default(),
            zones: default_thresholds(),
            far_zone: DEFAULT_FAR_ZONE.to_string(),
            unclassified_zone: DEFAULT_UNCLASSIFIED_ZONE.to_string(),
            bounds: TUNISIA_BOUNDS,
            jitter: JitterConfig::default(),
            categories: default_profiles(),
            reference_network: None,
            catchments: CatchmentConfig::default(),
            external_lookup: ExternalLookupConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine configuration from {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: EngineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bounds.is_valid() {
            return Err(ResolverError::Config("bounds must be a finite, non-inverted box".into()));
        }
        self.confidence.validate()?;
        self.jitter.validate()?;
        self.zone_classifier()?;
        self.catchment_classifier()?;
        self.external_lookup.validate()?;

        for (category, profile) in &self.categories {
            if normalize_text(category).is_empty() {
                return Err(ResolverError::Config("category tags must not be empty".into()));
            }
            if profile.layers.iter().any(|l| normalize_tag(l).is_empty()) {
                return Err(ResolverError::Config(format!(
                    "category '{}' lists an empty layer name",
                    category
                )));
            }
        }
        if let Some(network) = &self.reference_network {
            if network.trim().is_empty() {
                return Err(ResolverError::Config("reference_network must not be blank".into()));
            }
        }
        Ok(())
    }

    pub fn zone_classifier(&self) -> Result<ZoneClassifier> {
        ZoneClassifier::new(self.zones.clone(), &self.far_zone, &self.unclassified_zone)
    }

    pub fn catchment_classifier(&self) -> Result<CatchmentClassifier> {
        CatchmentClassifier::new(
            self.catchments.areas.clone(),
            self.bounds,
            &self.catchments.inside_label,
            &self.catchments.unknown_label,
        )
    }

    /// Category profiles keyed by normalized tag, layers normalized
    pub fn normalized_profiles(&self) -> BTreeMap<String, Vec<String>> {
        self.categories
            .iter()
            .map(|(category, profile)| {
                (
                    normalize_text(category),
                    profile.layers.iter().map(|l| normalize_tag(l)).collect(),
                )
            })
            .collect()
    }
}
