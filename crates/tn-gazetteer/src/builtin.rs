//! Built-in Tunisian reference data
//!
//! Coordinates were collected from verified street/site positions for the
//! professional categories covered by the dashboard. Within the pattern
//! table, more specific patterns are registered before the generic ones
//! they contain ("avenue habib bourguiba sfax" before
//! "avenue habib bourguiba"), since the first registered match wins.

use crate::gazetteer::{GazetteerEntry, ShortGeocode};
use crate::geo::Coordinate;
use crate::governorate::GovernorateCentroid;

pub const LAYER_MEDICAL_CENTERS: &str = "medical_centers";
pub const LAYER_BUSINESS: &str = "business";
pub const LAYER_STREETS: &str = "streets";
pub const LAYER_DISTRICTS: &str = "districts";

/// Known medical centers and clinics (doctors)
const MEDICAL_CENTERS: &[(&str, f64, f64)] = &[
    ("centre medical ibn ennafis", 36.8622, 10.1950),
    ("hannibal medical center", 36.8134, 10.1852),
    ("lac medical center", 36.8189, 10.1756),
    ("tunisie medicale", 36.8008, 10.1817),
    ("centre medical pasteur", 36.7969, 10.1728),
    ("polyclinique les jasmins", 36.8085, 10.1856),
    ("bardo center", 36.8150, 10.1950),
    ("carthage medical", 36.8529, 10.3312),
    ("clinique la rose", 36.8019, 10.1797),
    ("residence al andalos", 36.8567, 10.1889),
    ("centre medical el ghazela", 36.8678, 10.1978),
    ("immeuble la perla", 36.8622, 10.1950),
    ("maxula medical center", 36.7539, 10.2192),
];

/// Business districts and office hubs (advisors, accountants)
const BUSINESS_HUBS: &[(&str, f64, f64)] = &[
    ("centre urbain nord", 36.8522, 10.1775),
    ("les berges du lac", 36.8420, 10.2280),
    ("lac 2", 36.8380, 10.2250),
    ("lac 1", 36.8350, 10.2180),
    ("mutuelleville", 36.8108, 10.1931),
    ("cite mahrajene", 36.8597, 10.1944),
    ("el omrane", 36.8197, 10.1544),
    ("bab bhar", 36.7997, 10.1717),
    ("rue de syrie", 36.8008, 10.1817),
    ("avenue kheireddine pacha", 36.7908, 10.1717),
    ("riadh el andalous", 36.8290, 10.1485),
    ("technopark el ghazela", 36.8990, 10.1885),
    ("sahloul", 35.8267, 10.5950),
    ("sousse medina", 35.8256, 10.6350),
    ("sousse nord", 35.8456, 10.6250),
    ("khezama", 35.8056, 10.6250),
    ("sidi abdelhamid", 35.8156, 10.6050),
    ("sfax medina", 34.7398, 10.7607),
    ("sfax nord", 34.7598, 10.7707),
    ("route tunis sfax", 34.7498, 10.7507),
    ("rue salem harzallah", 34.7398, 10.7607),
    ("skanes", 35.7372, 10.7867),
    ("bizerte nord", 37.2944, 9.8839),
];

/// Named streets and squares
const STREETS: &[(&str, f64, f64)] = &[
    ("avenue habib bourguiba sfax", 34.7456, 10.7634),
    ("avenue habib bourguiba sousse", 35.8256, 10.6369),
    ("avenue habib bourguiba", 36.8008, 10.1817),
    ("avenue youssef rouissi", 36.7989, 10.1856),
    ("rue luxembourg", 36.7969, 10.1728),
    ("avenue de carthage", 36.8035, 10.1845),
    ("rue de rome", 36.8055, 10.1825),
    ("rue d angleterre", 36.8075, 10.1805),
    ("place barcelone", 36.8045, 10.1835),
    ("rue de marseille", 36.8123, 10.1796),
    ("avenue de la liberte", 36.8123, 10.1796),
    ("avenue mohamed v", 36.8156, 10.1645),
    ("rue des freres haffouz", 36.8567, 10.1889),
    ("avenue taieb mhiri", 36.8622, 10.1950),
];

/// Neighbourhoods, delegations and secondary towns
const DISTRICTS: &[(&str, f64, f64)] = &[
    ("belvedere", 36.8289, 10.1723),
    ("lafayette", 36.8123, 10.1796),
    ("montplaisir", 36.8156, 10.1645),
    ("mont plaisir", 36.8156, 10.1645),
    ("cite ennasr", 36.8634, 10.1789),
    ("ennasr 1", 36.8634, 10.1789),
    ("ennasr 2", 36.8644, 10.1799),
    ("el menzah", 36.8567, 10.1834),
    ("menzah", 36.8567, 10.1834),
    ("el manar", 36.8456, 10.1923),
    ("manar", 36.8456, 10.1923),
    ("cite el ghazala", 36.8823, 10.1678),
    ("ghazala", 36.8823, 10.1678),
    ("ariana ville", 36.8625, 10.1956),
    ("centre ville ariana", 36.8625, 10.1956),
    ("la soukra", 36.8734, 10.2045),
    ("soukra", 36.8734, 10.2045),
    ("raoued", 36.8923, 10.1845),
    ("enkhilet", 36.8923, 10.1845),
    ("sfax ville", 34.7406, 10.7603),
    ("centre ville sfax", 34.7406, 10.7603),
    ("sfax jadida", 34.7234, 10.7456),
    ("route de mahdia", 34.7234, 10.7456),
    ("sousse ville", 35.8256, 10.6369),
    ("centre ville sousse", 35.8256, 10.6369),
    ("rades", 36.7683, 10.2753),
    ("hammam lif", 36.7300, 10.3411),
    ("fouchana", 36.6986, 10.1700),
    ("mohamadia", 36.6833, 10.1500),
    ("hammamet", 36.4000, 10.6167),
    ("kelibia", 36.8475, 11.0939),
    ("soliman", 36.7028, 10.4847),
    ("ksar hellal", 35.6472, 10.8956),
    ("menzel bourguiba", 37.1587, 9.7848),
    ("haffouz", 35.6456, 9.7833),
    ("ksour essef", 35.4167, 10.9944),
    ("metlaoui", 34.3208, 8.4000),
    ("mareth", 33.5500, 10.3833),
    ("sbeitla", 35.2361, 9.1153),
    ("sakiet sidi youssef", 36.2167, 8.3500),
    ("tabarka", 36.9544, 8.7592),
    ("mejez el bab", 36.6481, 9.6189),
    ("testour", 36.5511, 9.4431),
    ("den den", 36.8345, 10.1234),
];

/// Proprietary short geocodes with surveyed positions
const SHORT_GEOCODES: &[(&str, f64, f64, &str)] = &[
    ("V5H9+JPG", 36.8290, 10.1485, "Riadh El Andalous, Ariana"),
    ("V5JH+QPX", 36.8347, 10.1800, "Ariana"),
    ("V5JG+XQ2", 36.8348, 10.1770, "Ariana"),
];

/// The 24 governorates with their centroids and common alternative spellings
const GOVERNORATES: &[(&str, f64, f64, &[&str])] = &[
    ("Tunis", 36.8065, 10.1815, &[]),
    ("Ariana", 36.8665, 10.1965, &[]),
    ("Ben Arous", 36.7536, 10.2278, &[]),
    ("Manouba", 36.8097, 10.0969, &["Mannouba"]),
    ("Nabeul", 36.4561, 10.7376, &[]),
    ("Zaghouan", 36.4028, 10.1428, &[]),
    ("Bizerte", 37.2744, 9.8739, &["Binzert"]),
    ("Béja", 36.7256, 9.1847, &["Bajah"]),
    ("Jendouba", 36.5008, 8.7803, &[]),
    ("Le Kef", 36.1742, 8.7131, &["Kef", "El Kef"]),
    ("Siliana", 36.0836, 9.3700, &[]),
    ("Sousse", 35.8256, 10.6364, &[]),
    ("Monastir", 35.7772, 10.8167, &[]),
    ("Mahdia", 35.5047, 11.0622, &[]),
    ("Sfax", 34.7398, 10.7607, &[]),
    ("Kairouan", 35.6781, 10.0963, &[]),
    ("Kasserine", 35.1675, 8.8308, &[]),
    ("Sidi Bouzid", 35.0381, 9.4858, &[]),
    ("Gabès", 33.8815, 10.0982, &[]),
    ("Médenine", 33.3367, 10.5056, &["Mednine"]),
    ("Tataouine", 32.9297, 10.4517, &[]),
    ("Gafsa", 34.4250, 8.7842, &[]),
    ("Tozeur", 33.9203, 8.1333, &[]),
    ("Kébili", 33.7064, 8.9692, &["Kbili"]),
];

/// Pattern table in scan order: medical centers, business hubs, streets, districts
pub fn gazetteer_entries() -> Vec<GazetteerEntry> {
    let layers: [(&str, &[(&str, f64, f64)]); 4] = [
        (LAYER_MEDICAL_CENTERS, MEDICAL_CENTERS),
        (LAYER_BUSINESS, BUSINESS_HUBS),
        (LAYER_STREETS, STREETS),
        (LAYER_DISTRICTS, DISTRICTS),
    ];

    layers
        .iter()
        .flat_map(|(layer, rows)| {
            rows.iter()
                .map(move |&(pattern, lat, lon)| GazetteerEntry::new(pattern, lat, lon).with_layer(layer))
        })
        .collect()
}

pub fn short_geocodes() -> Vec<ShortGeocode> {
    SHORT_GEOCODES
        .iter()
        .map(|&(token, lat, lon, label)| ShortGeocode {
            token: token.to_string(),
            anchor: Coordinate::new(lat, lon),
            label: Some(label.to_string()),
        })
        .collect()
}

pub fn governorates() -> Vec<GovernorateCentroid> {
    GOVERNORATES
        .iter()
        .map(|&(name, lat, lon, aliases)| GovernorateCentroid::new(name, lat, lon).with_aliases(aliases))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_governorates_present() {
        assert_eq!(governorates().len(), 24);
    }

    #[test]
    fn test_specific_street_before_generic() {
        let entries = gazetteer_entries();
        let pos = |p: &str| entries.iter().position(|e| e.pattern == p).unwrap();
        assert!(pos("avenue habib bourguiba sfax") < pos("avenue habib bourguiba"));
        assert!(pos("avenue habib bourguiba sousse") < pos("avenue habib bourguiba"));
        assert!(pos("el menzah") < pos("menzah"));
    }

    #[test]
    fn test_layers_tagged() {
        let entries = gazetteer_entries();
        assert!(entries.iter().all(|e| e.layer.is_some()));
        assert_eq!(entries.len(), MEDICAL_CENTERS.len() + BUSINESS_HUBS.len() + STREETS.len() + DISTRICTS.len());
    }
}
