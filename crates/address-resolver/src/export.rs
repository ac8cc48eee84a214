//! Output writers: JSON report, flat CSV, GeoJSON

use crate::confidence::ConfidenceBand;
use crate::{infinite_km, AddressableEntity, ResolutionMethod, ResolvedLocation, ResolverError, Result};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Counts over one batch of records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub total: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub by_method: BTreeMap<String, usize>,
    pub by_zone: BTreeMap<String, usize>,
    pub by_catchment: BTreeMap<String, usize>,
    pub by_confidence_band: BTreeMap<String, usize>,
    /// RFC 3339
    pub generated_at: String,
}

impl ReportMetadata {
    pub fn from_records(records: &[ResolvedLocation]) -> Self {
        let mut by_method = BTreeMap::new();
        let mut by_zone = BTreeMap::new();
        let mut by_catchment = BTreeMap::new();
        let mut by_confidence_band = BTreeMap::new();

        for r in records {
            *by_method.entry(r.resolution_method.to_string()).or_insert(0) += 1;
            *by_zone.entry(r.zone.clone()).or_insert(0) += 1;
            *by_catchment.entry(r.catchment.clone()).or_insert(0) += 1;
            *by_confidence_band
                .entry(ConfidenceBand::of(r.confidence).as_str().to_string())
                .or_insert(0) += 1;
        }

        let unresolved = records.iter().filter(|r| !r.is_resolved()).count();
        Self {
            total: records.len(),
            resolved: records.len() - unresolved,
            unresolved,
            by_method,
            by_zone,
            by_catchment,
            by_confidence_band,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub records: Vec<ResolvedLocation>,
    pub metadata: ReportMetadata,
}

impl ResolutionReport {
    pub fn new(records: Vec<ResolvedLocation>) -> Self {
        let metadata = ReportMetadata::from_records(&records);
        Self { records, metadata }
    }
}

pub fn write_json<W: Write>(report: &ResolutionReport, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

/// One CSV row: input columns first, then the derived ones
#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    id: String,
    raw_address: Option<String>,
    region_hint: Option<String>,
    short_geocode_token: Option<String>,
    category: String,
    name: Option<String>,
    delegation: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    confidence: f64,
    resolution_method: ResolutionMethod,
    matched_on: Option<String>,
    nearest_reference_id: Option<String>,
    /// Number or `inf`
    distance_km: String,
    zone: String,
    catchment: String,
}

impl From<&ResolvedLocation> for CsvRecord {
    fn from(r: &ResolvedLocation) -> Self {
        let e = &r.entity;
        Self {
            id: e.id.clone(),
            raw_address: e.raw_address.clone(),
            region_hint: e.region_hint.clone(),
            short_geocode_token: e.short_geocode_token.clone(),
            category: e.category.clone(),
            name: e.name.clone(),
            delegation: e.delegation.clone(),
            latitude: r.latitude,
            longitude: r.longitude,
            confidence: r.confidence,
            resolution_method: r.resolution_method,
            matched_on: r.matched_on.clone(),
            nearest_reference_id: r.nearest_reference_id.clone(),
            distance_km: infinite_km::format(r.distance_km),
            zone: r.zone.clone(),
            catchment: r.catchment.clone(),
        }
    }
}

impl TryFrom<CsvRecord> for ResolvedLocation {
    type Error = ResolverError;

    fn try_from(row: CsvRecord) -> Result<Self> {
        let distance_km = infinite_km::parse(&row.distance_km).ok_or_else(|| {
            ResolverError::InputFormat(format!("record '{}': bad distance '{}'", row.id, row.distance_km))
        })?;
        Ok(Self {
            entity: AddressableEntity {
                id: row.id,
                raw_address: row.raw_address,
                region_hint: row.region_hint,
                short_geocode_token: row.short_geocode_token,
                category: row.category,
                name: row.name,
                delegation: row.delegation,
            },
            latitude: row.latitude,
            longitude: row.longitude,
            confidence: row.confidence,
            resolution_method: row.resolution_method,
            matched_on: row.matched_on,
            nearest_reference_id: row.nearest_reference_id,
            distance_km,
            zone: row.zone,
            catchment: row.catchment,
        })
    }
}

pub fn write_csv<W: Write>(records: &[ResolvedLocation], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for r in records {
        csv_writer.serialize(CsvRecord::from(r))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read records written by [`write_csv`]
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ResolvedLocation>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in csv_reader.deserialize::<CsvRecord>() {
        records.push(ResolvedLocation::try_from(row?)?);
    }
    Ok(records)
}

/// Resolved records as map points; unresolved records are left out
pub fn to_geojson(records: &[ResolvedLocation]) -> FeatureCollection {
    let features = records
        .iter()
        .filter_map(|r| {
            let c = r.coordinate()?;
            let mut properties = JsonObject::new();
            properties.insert("id".into(), json!(r.entity.id));
            properties.insert("name".into(), json!(r.entity.name));
            properties.insert("category".into(), json!(r.entity.category));
            properties.insert("confidence".into(), json!(r.confidence));
            properties.insert("resolution_method".into(), json!(r.resolution_method));
            properties.insert("matched_on".into(), json!(r.matched_on));
            properties.insert("nearest_reference_id".into(), json!(r.nearest_reference_id));
            let distance = if r.distance_km.is_finite() {
                json!(r.distance_km)
            } else {
                json!(infinite_km::INF_TEXT)
            };
            properties.insert("distance_km".into(), distance);
            properties.insert("zone".into(), json!(r.zone));
            properties.insert("catchment".into(), json!(r.catchment));

            Some(Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![c.longitude, c.latitude]))),
                id: Some(geojson::feature::Id::String(r.entity.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
