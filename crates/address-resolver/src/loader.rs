//! Entity and reference-point loading (JSON or CSV, chosen by extension)

use crate::locator::ReferencePoint;
use crate::{AddressableEntity, ResolverError, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tn_gazetteer::Coordinate;
use tracing::{info, warn};

/// Category assigned to rows that carry none
pub const UNSPECIFIED_CATEGORY: &str = "unspecified";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(ResolverError::InputFormat(format!(
                "{:?}: expected a .json or .csv file",
                path
            ))),
        }
    }
}

/// Ids arrive as strings or numbers in JSON exports
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

/// Raw entity row from JSON
#[derive(Debug, Deserialize)]
struct RawEntity {
    id: Option<RawId>,
    #[serde(alias = "address")]
    raw_address: Option<String>,
    #[serde(alias = "governorate")]
    region_hint: Option<String>,
    #[serde(alias = "plus_code")]
    short_geocode_token: Option<String>,
    category: Option<String>,
    name: Option<String>,
    delegation: Option<String>,
}

/// Raw entity row from CSV (every cell is text)
#[derive(Debug, Deserialize)]
struct RawEntityRow {
    id: Option<String>,
    raw_address: Option<String>,
    region_hint: Option<String>,
    short_geocode_token: Option<String>,
    category: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    delegation: Option<String>,
}

impl From<RawEntityRow> for RawEntity {
    fn from(row: RawEntityRow) -> Self {
        Self {
            id: row.id.map(RawId::Text),
            raw_address: row.raw_address,
            region_hint: row.region_hint,
            short_geocode_token: row.short_geocode_token,
            category: row.category,
            name: row.name,
            delegation: row.delegation,
        }
    }
}

/// Raw reference point from JSON or CSV
#[derive(Debug, Deserialize)]
struct RawReference {
    id: Option<String>,
    name: Option<String>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude")]
    lon: Option<f64>,
    #[serde(default, alias = "bank")]
    network: Option<String>,
}

/// Blank strings count as absent
fn clean(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn read_json_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

fn read_csv_rows<T: for<'de> Deserialize<'de>, R: Read>(reader: R) -> Result<Vec<T>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Load addressable entities from a `.json` array or a `.csv` table
pub fn load_entities(path: impl AsRef<Path>) -> Result<Vec<AddressableEntity>> {
    let path = path.as_ref();
    info!("Loading entities from {:?}", path);

    let raw: Vec<RawEntity> = match InputFormat::from_path(path)? {
        InputFormat::Json => read_json_rows(path)?,
        InputFormat::Csv => read_csv_rows::<RawEntityRow, _>(File::open(path)?)?
            .into_iter()
            .map(RawEntity::from)
            .collect(),
    };

    let entities = build_entities(raw);
    info!("Loaded {} entities", entities.len());
    Ok(entities)
}

fn build_entities(raw: Vec<RawEntity>) -> Vec<AddressableEntity> {
    let mut entities = Vec::with_capacity(raw.len());
    let mut seen = HashSet::new();
    let mut skipped = 0;

    for (row, r) in raw.into_iter().enumerate() {
        let Some(id) = r.id.map(RawId::into_string).filter(|id| !id.is_empty()) else {
            warn!("Entity row {} has no id, skipped", row + 1);
            skipped += 1;
            continue;
        };
        if !seen.insert(id.clone()) {
            warn!("Duplicate entity id '{}' (row {})", id, row + 1);
        }

        entities.push(AddressableEntity {
            id,
            raw_address: clean(r.raw_address),
            region_hint: clean(r.region_hint),
            short_geocode_token: clean(r.short_geocode_token),
            category: clean(r.category).unwrap_or_else(|| UNSPECIFIED_CATEGORY.to_string()),
            name: clean(r.name),
            delegation: clean(r.delegation),
        });
    }

    if skipped > 0 {
        warn!("{} entity rows skipped for missing id", skipped);
    }
    entities
}

/// Load reference points from a `.json` array or a `.csv` table.
/// Rows with missing or invalid coordinates are skipped and counted.
pub fn load_references(path: impl AsRef<Path>) -> Result<Vec<ReferencePoint>> {
    let path = path.as_ref();
    info!("Loading reference points from {:?}", path);

    let raw: Vec<RawReference> = match InputFormat::from_path(path)? {
        InputFormat::Json => read_json_rows(path)?,
        InputFormat::Csv => read_csv_rows(File::open(path)?)?,
    };

    let mut points = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (i, r) in raw.into_iter().enumerate() {
        let coordinate = match (r.lat, r.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
            _ => {
                skipped += 1;
                continue;
            }
        };
        if !coordinate.is_valid() {
            skipped += 1;
            continue;
        }

        let id = clean(r.id).unwrap_or_else(|| format!("ref-{}", i));
        let name = clean(r.name).unwrap_or_else(|| id.clone());
        points.push(ReferencePoint {
            id,
            name,
            coordinate,
            network: clean(r.network),
        });
    }

    if skipped > 0 {
        warn!("{} reference rows skipped for missing or invalid coordinates", skipped);
    }
    info!("Loaded {} reference points ({} skipped)", points.len(), skipped);

    Ok(points)
}
