//! Catchment tagging: which named trade area a coordinate falls in

use crate::{ResolverError, Result};
use serde::{Deserialize, Serialize};
use tn_gazetteer::{BoundingBox, Coordinate, TUNISIA_BOUNDS};

pub const DEFAULT_CATCHMENT: &str = "zone_de_chalandise";
/// Greater Tunis trade area
pub const DEFAULT_CATCHMENT_BOUNDS: BoundingBox = BoundingBox::new(36.80, 36.87, 10.12, 10.20);
pub const DEFAULT_INSIDE_LABEL: &str = "tunisia_other";
pub const DEFAULT_UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catchment {
    pub name: String,
    pub bounds: BoundingBox,
}

impl Catchment {
    pub fn new(name: &str, bounds: BoundingBox) -> Self {
        Self {
            name: name.to_string(),
            bounds,
        }
    }
}

pub fn default_catchments() -> Vec<Catchment> {
    vec![Catchment::new(DEFAULT_CATCHMENT, DEFAULT_CATCHMENT_BOUNDS)]
}

/// Ordered catchment list; the first box containing the point wins
#[derive(Debug, Clone)]
pub struct CatchmentClassifier {
    catchments: Vec<Catchment>,
    national: BoundingBox,
    inside_label: String,
    unknown_label: String,
}

impl Default for CatchmentClassifier {
    fn default() -> Self {
        Self {
            catchments: default_catchments(),
            national: TUNISIA_BOUNDS,
            inside_label: DEFAULT_INSIDE_LABEL.to_string(),
            unknown_label: DEFAULT_UNKNOWN_LABEL.to_string(),
        }
    }
}

impl CatchmentClassifier {
    pub fn new(
        catchments: Vec<Catchment>,
        national: BoundingBox,
        inside_label: &str,
        unknown_label: &str,
    ) -> Result<Self> {
        for c in &catchments {
            if c.name.trim().is_empty() {
                return Err(ResolverError::Config("catchment names must not be empty".into()));
            }
            if !c.bounds.is_valid() {
                return Err(ResolverError::Config(format!("catchment '{}' has an invalid box", c.name)));
            }
        }
        if inside_label.trim().is_empty() || unknown_label.trim().is_empty() {
            return Err(ResolverError::Config("catchment fallback labels must not be empty".into()));
        }

        Ok(Self {
            catchments,
            national,
            inside_label: inside_label.to_string(),
            unknown_label: unknown_label.to_string(),
        })
    }

    pub fn classify(&self, location: Option<&Coordinate>) -> &str {
        let Some(c) = location else {
            return &self.unknown_label;
        };
        if let Some(hit) = self.catchments.iter().find(|k| k.bounds.contains(c)) {
            return &hit.name;
        }
        if self.national.contains(c) {
            &self.inside_label
        } else {
            &self.unknown_label
        }
    }

    pub fn catchments(&self) -> &[Catchment] {
        &self.catchments
    }
}
