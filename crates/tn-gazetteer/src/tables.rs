//! Reference table set: loading and validation

use crate::builtin;
use crate::gazetteer::{Gazetteer, GazetteerEntry, ShortGeocode, ShortGeocodeTable};
use crate::geo::{BoundingBox, Coordinate, TUNISIA_BOUNDS};
use crate::governorate::{GovernorateCentroid, GovernorateTable};
use crate::{GazetteerError, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Raw gazetteer row from JSON
#[derive(Debug, Deserialize)]
struct RawPattern {
    pattern: String,
    lat: f64,
    lon: f64,
    layer: Option<String>,
    label: Option<String>,
    zone: Option<BoundingBox>,
}

/// Raw short geocode row from JSON
#[derive(Debug, Deserialize)]
struct RawShortGeocode {
    token: String,
    lat: f64,
    lon: f64,
    label: Option<String>,
}

/// Raw governorate row from JSON
#[derive(Debug, Deserialize)]
struct RawGovernorate {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Tables file layout; every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TablesFile {
    gazetteer: Vec<RawPattern>,
    short_geocodes: Vec<RawShortGeocode>,
    governorates: Vec<RawGovernorate>,
}

/// The three static lookup tables, validated against one national box.
///
/// Built once before any entity is resolved and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    pub gazetteer: Gazetteer,
    pub short_geocodes: ShortGeocodeTable,
    pub governorates: GovernorateTable,
    pub bounds: BoundingBox,
}

impl ReferenceTables {
    /// Built-in Tunisian tables checked against [`TUNISIA_BOUNDS`]
    pub fn builtin() -> Result<Self> {
        Self::builtin_within(TUNISIA_BOUNDS)
    }

    pub fn builtin_within(bounds: BoundingBox) -> Result<Self> {
        Self::from_parts(
            builtin::gazetteer_entries(),
            builtin::short_geocodes(),
            builtin::governorates(),
            bounds,
        )
    }

    pub fn from_parts(
        entries: Vec<GazetteerEntry>,
        codes: Vec<ShortGeocode>,
        centroids: Vec<GovernorateCentroid>,
        bounds: BoundingBox,
    ) -> Result<Self> {
        if !bounds.is_valid() {
            return Err(GazetteerError::InvalidBounds("national bounds".to_string()));
        }
        let tables = Self {
            gazetteer: Gazetteer::from_entries(entries, &bounds)?,
            short_geocodes: ShortGeocodeTable::from_codes(codes, &bounds)?,
            governorates: GovernorateTable::from_centroids(centroids, &bounds)?,
            bounds,
        };
        info!(
            "Reference tables ready: {} patterns in {} layers, {} short geocodes, {} governorates",
            tables.gazetteer.len(),
            tables.gazetteer.layers().len(),
            tables.short_geocodes.len(),
            tables.governorates.len()
        );
        Ok(tables)
    }

    /// Load tables from a JSON file.
    ///
    /// ```json
    /// {
    ///   "gazetteer": [{"pattern": "clinique la rose", "lat": 36.8019, "lon": 10.1797, "layer": "medical_centers"}],
    ///   "short_geocodes": [{"token": "V5H9+JPG", "lat": 36.8290, "lon": 10.1485}],
    ///   "governorates": [{"name": "Ariana", "lat": 36.8665, "lon": 10.1965, "aliases": ["l'Ariana"]}]
    /// }
    /// ```
    ///
    /// Any malformed row fails the whole load.
    pub fn load(path: impl AsRef<Path>, bounds: BoundingBox) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading reference tables from {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let raw: TablesFile = serde_json::from_reader(reader)?;

        let entries = raw
            .gazetteer
            .into_iter()
            .map(|r| {
                let mut entry = GazetteerEntry::new(&r.pattern, r.lat, r.lon);
                if let Some(layer) = r.layer.as_deref() {
                    entry = entry.with_layer(layer);
                }
                if let Some(label) = r.label.as_deref() {
                    entry = entry.with_label(label);
                }
                if let Some(zone) = r.zone {
                    entry = entry.with_zone(zone);
                }
                entry
            })
            .collect();

        let codes = raw
            .short_geocodes
            .into_iter()
            .map(|r| ShortGeocode {
                token: r.token,
                anchor: Coordinate::new(r.lat, r.lon),
                label: r.label,
            })
            .collect();

        let centroids = raw
            .governorates
            .into_iter()
            .map(|r| {
                let mut g = GovernorateCentroid::new(&r.name, r.lat, r.lon);
                g.aliases = r.aliases;
                g
            })
            .collect();

        Self::from_parts(entries, codes, centroids, bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_builtin_tables_validate() {
        let tables = ReferenceTables::builtin().unwrap();
        assert_eq!(tables.governorates.len(), 24);
        assert_eq!(tables.short_geocodes.len(), 3);
        assert_eq!(
            tables.gazetteer.layers(),
            vec!["medical_centers", "business", "streets", "districts"]
        );
    }

    #[test]
    fn test_builtin_generic_bourguiba() {
        let tables = ReferenceTables::builtin().unwrap();
        let hit = tables
            .gazetteer
            .find_in("15 avenue habib bourguiba tunis", None)
            .unwrap();
        assert_eq!(hit.anchor, Coordinate::new(36.8008, 10.1817));
    }

    #[test]
    fn test_load_from_json() {
        let file = write_json(
            r#"{
                "gazetteer": [
                    {"pattern": "Clinique La Rose", "lat": 36.8019, "lon": 10.1797, "layer": "Medical_Centers",
                     "label": "Clinique La Rose (Tunis)"},
                    {"pattern": "Belvédère", "lat": 36.8289, "lon": 10.1723,
                     "zone": {"lat_min": 36.80, "lat_max": 36.87, "lon_min": 10.12, "lon_max": 10.20}}
                ],
                "short_geocodes": [{"token": "V5H9+JPG", "lat": 36.8290, "lon": 10.1485}],
                "governorates": [{"name": "Ariana", "lat": 36.8665, "lon": 10.1965, "aliases": ["Aryanah"]}]
            }"#,
        );

        let tables = ReferenceTables::load(file.path(), TUNISIA_BOUNDS).unwrap();
        assert_eq!(tables.gazetteer.len(), 2);
        assert_eq!(tables.gazetteer.entries()[0].layer.as_deref(), Some("medical_centers"));
        assert_eq!(tables.gazetteer.entries()[0].label.as_deref(), Some("Clinique La Rose (Tunis)"));
        assert!(tables.gazetteer.entries()[0].zone.is_none());
        assert_eq!(tables.gazetteer.entries()[1].pattern, "belvedere");
        assert!(tables.gazetteer.entries()[1].zone.is_some());
        assert!(tables.short_geocodes.get("V5H9+JPG").is_some());
        assert_eq!(tables.governorates.lookup_hint("aryanah").unwrap().name, "Ariana");
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let file = write_json(r#"{"governorates": [{"name": "Sfax", "lat": 34.7398, "lon": 10.7607}]}"#);
        let tables = ReferenceTables::load(file.path(), TUNISIA_BOUNDS).unwrap();
        assert!(tables.gazetteer.is_empty());
        assert!(tables.short_geocodes.is_empty());
        assert_eq!(tables.governorates.len(), 1);
    }

    #[test]
    fn test_malformed_row_fails_load() {
        let file = write_json(r#"{"gazetteer": [{"pattern": "tunis", "lat": 36.8}]}"#);
        let err = ReferenceTables::load(file.path(), TUNISIA_BOUNDS).unwrap_err();
        assert!(matches!(err, GazetteerError::Json(_)));

        let file = write_json(r#"{"gazetteer": [{"pattern": "rome", "lat": 41.9, "lon": 12.5}]}"#);
        let err = ReferenceTables::load(file.path(), TUNISIA_BOUNDS).unwrap_err();
        assert!(matches!(err, GazetteerError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_invalid_national_bounds() {
        let err = ReferenceTables::builtin_within(BoundingBox::new(38.0, 30.0, 7.0, 12.0)).unwrap_err();
        assert!(matches!(err, GazetteerError::InvalidBounds(_)));
    }
}
