//! Pattern gazetteer and short-geocode table

use crate::geo::{BoundingBox, Coordinate};
use crate::normalize::{normalize_tag, normalize_text};
use crate::{GazetteerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One named place / street / site with its anchor coordinate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazetteerEntry {
    /// Normalized pattern searched for inside address text
    pub pattern: String,
    pub anchor: Coordinate,
    /// Layer tag used by category profiles (`medical_centers`, `streets`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    /// Display label of the site the pattern belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Area a jittered coordinate must stay inside
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<BoundingBox>,
}

impl GazetteerEntry {
    pub fn new(pattern: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            pattern: normalize_text(pattern),
            anchor: Coordinate::new(latitude, longitude),
            layer: None,
            label: None,
            zone: None,
        }
    }

    pub fn with_layer(mut self, layer: &str) -> Self {
        self.layer = Some(normalize_tag(layer));
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_zone(mut self, zone: BoundingBox) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Whether a profile scanning `layers` sees this entry.
    /// Entries without a layer are visible to everyone; `None` means all layers.
    pub fn in_layers(&self, layers: Option<&[String]>) -> bool {
        match (&self.layer, layers) {
            (None, _) | (_, None) => true,
            (Some(layer), Some(allowed)) => allowed.iter().any(|l| l == layer),
        }
    }
}

/// Ordered pattern table. Scan order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct Gazetteer {
    entries: Vec<GazetteerEntry>,
}

impl Gazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw entries, normalizing and validating each row.
    pub fn from_entries(entries: Vec<GazetteerEntry>, bounds: &BoundingBox) -> Result<Self> {
        let mut gazetteer = Self::new();
        for entry in entries {
            gazetteer.insert(entry, bounds)?;
        }
        Ok(gazetteer)
    }

    /// Append an entry after the existing ones.
    ///
    /// The pattern must be non-empty after normalization, unique within its
    /// layer, and its anchor must be a valid point inside `bounds` and inside
    /// its own zone.
    pub fn insert(&mut self, mut entry: GazetteerEntry, bounds: &BoundingBox) -> Result<()> {
        entry.pattern = normalize_text(&entry.pattern);
        entry.layer = entry.layer.as_deref().map(normalize_tag).filter(|l| !l.is_empty());

        if entry.pattern.is_empty() {
            return Err(GazetteerError::EmptyPattern {
                table: "gazetteer",
                row: self.entries.len(),
            });
        }
        validate_anchor(&entry.pattern, &entry.anchor, bounds)?;
        if let Some(zone) = entry.zone {
            if !zone.is_valid() {
                return Err(GazetteerError::InvalidBounds(entry.pattern));
            }
            if !zone.contains(&entry.anchor) {
                return Err(GazetteerError::AnchorOutsideZone { key: entry.pattern });
            }
        }
        if self
            .entries
            .iter()
            .any(|e| e.pattern == entry.pattern && e.layer == entry.layer)
        {
            return Err(GazetteerError::Duplicate {
                table: "gazetteer",
                key: entry.pattern,
            });
        }

        self.entries.push(entry);
        Ok(())
    }

    /// First entry (in insertion order) visible to `layers` whose pattern
    /// occurs in the already-normalized `text`.
    pub fn find_in(&self, text: &str, layers: Option<&[String]>) -> Option<&GazetteerEntry> {
        if text.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .filter(|e| e.in_layers(layers))
            .find(|e| text.contains(e.pattern.as_str()))
    }

    pub fn entries(&self) -> &[GazetteerEntry] {
        &self.entries
    }

    /// Distinct layer tags, in first-seen order
    pub fn layers(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(|e| e.layer.as_deref())
            .filter(|l| seen.insert(*l))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Short proprietary geocode (plus-code style token) and its point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortGeocode {
    pub token: String,
    pub anchor: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Exact-match token lookup. Tokens are compared verbatim after trimming.
#[derive(Debug, Clone, Default)]
pub struct ShortGeocodeTable {
    codes: HashMap<String, ShortGeocode>,
}

impl ShortGeocodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_codes(codes: Vec<ShortGeocode>, bounds: &BoundingBox) -> Result<Self> {
        let mut table = Self::new();
        for code in codes {
            table.insert(code, bounds)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, mut code: ShortGeocode, bounds: &BoundingBox) -> Result<()> {
        code.token = code.token.trim().to_string();
        if code.token.is_empty() {
            return Err(GazetteerError::EmptyPattern {
                table: "short_geocodes",
                row: self.codes.len(),
            });
        }
        validate_anchor(&code.token, &code.anchor, bounds)?;
        if self.codes.contains_key(&code.token) {
            return Err(GazetteerError::Duplicate {
                table: "short_geocodes",
                key: code.token,
            });
        }
        self.codes.insert(code.token.clone(), code);
        Ok(())
    }

    pub fn get(&self, token: &str) -> Option<&ShortGeocode> {
        self.codes.get(token.trim())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

pub(crate) fn validate_anchor(key: &str, anchor: &Coordinate, bounds: &BoundingBox) -> Result<()> {
    if !anchor.is_valid() || !bounds.contains(anchor) {
        return Err(GazetteerError::InvalidCoordinate {
            key: key.to_string(),
            latitude: anchor.latitude,
            longitude: anchor.longitude,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::TUNISIA_BOUNDS;

    fn sample() -> Gazetteer {
        Gazetteer::from_entries(
            vec![
                GazetteerEntry::new("Avenue Habib Bourguiba Sfax", 34.7406, 10.7603).with_layer("streets"),
                GazetteerEntry::new("Avenue Habib Bourguiba", 36.8008, 10.1817).with_layer("streets"),
                GazetteerEntry::new("Clinique La Rose", 36.8019, 10.1797).with_layer("medical_centers"),
                GazetteerEntry::new("Menzah", 36.8567, 10.1834),
            ],
            &TUNISIA_BOUNDS,
        )
        .unwrap()
    }

    #[test]
    fn test_first_registered_wins() {
        let g = sample();
        let hit = g.find_in("12 avenue habib bourguiba sfax", None).unwrap();
        assert_eq!(hit.pattern, "avenue habib bourguiba sfax");

        let hit = g.find_in("clinique la rose avenue habib bourguiba", None).unwrap();
        assert_eq!(hit.pattern, "avenue habib bourguiba");
    }

    #[test]
    fn test_layer_filter() {
        let g = sample();
        let streets = vec!["streets".to_string()];
        assert!(g.find_in("clinique la rose", Some(&streets)).is_none());
        // Untagged entries are visible to every profile
        assert!(g.find_in("el menzah 5", Some(&streets)).is_some());
    }

    #[test]
    fn test_patterns_normalized_on_insert() {
        let g = sample();
        assert_eq!(g.entries()[2].pattern, "clinique la rose");
        assert_eq!(g.layers(), vec!["streets", "medical_centers"]);
    }

    #[test]
    fn test_rejects_out_of_bounds_anchor() {
        let err = Gazetteer::from_entries(
            vec![GazetteerEntry::new("paris", 48.8566, 2.3522)],
            &TUNISIA_BOUNDS,
        )
        .unwrap_err();
        assert!(matches!(err, GazetteerError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_rejects_empty_and_duplicate() {
        let err = Gazetteer::from_entries(vec![GazetteerEntry::new(" ' ", 36.8, 10.1)], &TUNISIA_BOUNDS)
            .unwrap_err();
        assert!(matches!(err, GazetteerError::EmptyPattern { .. }));

        let err = Gazetteer::from_entries(
            vec![
                GazetteerEntry::new("Lac 2", 36.8380, 10.2250),
                GazetteerEntry::new("lac  2", 36.8189, 10.1756),
            ],
            &TUNISIA_BOUNDS,
        )
        .unwrap_err();
        assert!(matches!(err, GazetteerError::Duplicate { .. }));
    }

    #[test]
    fn test_anchor_must_sit_in_zone() {
        let zone = BoundingBox::new(36.80, 36.87, 10.12, 10.20);
        let err = Gazetteer::from_entries(
            vec![GazetteerEntry::new("sfax ville", 34.7398, 10.7607).with_zone(zone)],
            &TUNISIA_BOUNDS,
        )
        .unwrap_err();
        assert!(matches!(err, GazetteerError::AnchorOutsideZone { .. }));
    }

    #[test]
    fn test_short_geocode_exact_lookup() {
        let table = ShortGeocodeTable::from_codes(
            vec![ShortGeocode {
                token: "V5H9+JPG".to_string(),
                anchor: Coordinate::new(36.8290, 10.1485),
                label: None,
            }],
            &TUNISIA_BOUNDS,
        )
        .unwrap();

        assert!(table.get("V5H9+JPG").is_some());
        assert!(table.get(" V5H9+JPG ").is_some());
        // Verbatim: no case folding
        assert!(table.get("v5h9+jpg").is_none());
    }
}
