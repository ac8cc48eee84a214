//! Governorate centroid table (last-resort fallback)

use crate::gazetteer::validate_anchor;
use crate::geo::{BoundingBox, Coordinate};
use crate::normalize::normalize_text;
use crate::{GazetteerError, Result};
use serde::{Deserialize, Serialize};

/// Shortest hint allowed to match as a fragment of a governorate name
pub const MIN_REVERSE_HINT_LEN: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorateCentroid {
    /// Canonical display name ("Ariana", "Ben Arous", ...)
    pub name: String,
    pub centroid: Coordinate,
    /// Alternative spellings ("Mannouba", "Le Kef", ...)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Normalized name followed by normalized aliases
    #[serde(skip)]
    keys: Vec<String>,
}

impl GovernorateCentroid {
    pub fn new(name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.to_string(),
            centroid: Coordinate::new(latitude, longitude),
            aliases: Vec::new(),
            keys: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Normalized lookup keys (name first)
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn build_keys(&mut self) {
        let mut keys = Vec::with_capacity(1 + self.aliases.len());
        for k in std::iter::once(&self.name).chain(self.aliases.iter()) {
            let k = normalize_text(k);
            if !k.is_empty() && !keys.contains(&k) {
                keys.push(k);
            }
        }
        self.keys = keys;
    }

    /// Either-direction substring match against a normalized region hint
    fn matches_hint(&self, hint: &str) -> bool {
        self.keys.iter().any(|k| {
            hint.contains(k.as_str()) || (hint.len() >= MIN_REVERSE_HINT_LEN && k.contains(hint))
        })
    }

    /// Whole-word occurrence of a key inside normalized address text
    fn mentioned_in(&self, padded_text: &str) -> bool {
        self.keys
            .iter()
            .any(|k| padded_text.contains(&format!(" {} ", k)))
    }
}

/// Ordered governorate table. Lookups return the first match in table order.
#[derive(Debug, Clone, Default)]
pub struct GovernorateTable {
    governorates: Vec<GovernorateCentroid>,
}

impl GovernorateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_centroids(centroids: Vec<GovernorateCentroid>, bounds: &BoundingBox) -> Result<Self> {
        let mut table = Self::new();
        for c in centroids {
            table.insert(c, bounds)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, mut centroid: GovernorateCentroid, bounds: &BoundingBox) -> Result<()> {
        centroid.build_keys();
        if centroid.keys.is_empty() {
            return Err(GazetteerError::EmptyPattern {
                table: "governorates",
                row: self.governorates.len(),
            });
        }
        validate_anchor(&centroid.name, &centroid.centroid, bounds)?;
        if self
            .governorates
            .iter()
            .any(|g| g.keys[0] == centroid.keys[0])
        {
            return Err(GazetteerError::Duplicate {
                table: "governorates",
                key: centroid.name,
            });
        }
        self.governorates.push(centroid);
        Ok(())
    }

    /// Match a region hint (normalized or not) against names and aliases
    pub fn lookup_hint(&self, hint: &str) -> Option<&GovernorateCentroid> {
        let hint = normalize_text(hint);
        if hint.is_empty() {
            return None;
        }
        self.governorates.iter().find(|g| g.matches_hint(&hint))
    }

    /// Find a governorate named in free address text
    pub fn extract_from_text(&self, text: &str) -> Option<&GovernorateCentroid> {
        let text = normalize_text(text);
        if text.is_empty() {
            return None;
        }
        let padded = format!(" {} ", text);
        self.governorates.iter().find(|g| g.mentioned_in(&padded))
    }

    pub fn get(&self, name: &str) -> Option<&GovernorateCentroid> {
        let key = normalize_text(name);
        self.governorates.iter().find(|g| g.keys.first() == Some(&key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &GovernorateCentroid> {
        self.governorates.iter()
    }

    pub fn len(&self) -> usize {
        self.governorates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.governorates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::TUNISIA_BOUNDS;

    fn table() -> GovernorateTable {
        GovernorateTable::from_centroids(
            vec![
                GovernorateCentroid::new("Tunis", 36.8065, 10.1815),
                GovernorateCentroid::new("Ariana", 36.8665, 10.1965),
                GovernorateCentroid::new("Manouba", 36.8097, 10.0969).with_aliases(&["Mannouba"]),
                GovernorateCentroid::new("Le Kef", 36.1742, 8.7131).with_aliases(&["Kef"]),
                GovernorateCentroid::new("Béja", 36.7256, 9.1847),
            ],
            &TUNISIA_BOUNDS,
        )
        .unwrap()
    }

    #[test]
    fn test_hint_contains_name() {
        let t = table();
        assert_eq!(t.lookup_hint("l'Ariana").unwrap().name, "Ariana");
        assert_eq!(t.lookup_hint("Gouvernorat de Tunis").unwrap().name, "Tunis");
    }

    #[test]
    fn test_name_contains_hint() {
        let t = table();
        assert_eq!(t.lookup_hint("arian").unwrap().name, "Ariana");
        // Too short to match as a fragment
        assert!(t.lookup_hint("ar").is_none());
    }

    #[test]
    fn test_aliases_and_accents() {
        let t = table();
        assert_eq!(t.lookup_hint("MANNOUBA").unwrap().name, "Manouba");
        assert_eq!(t.lookup_hint("beja").unwrap().name, "Béja");
        assert_eq!(t.lookup_hint("Kef").unwrap().name, "Le Kef");
    }

    #[test]
    fn test_extract_whole_words_only() {
        let t = table();
        assert_eq!(t.extract_from_text("Cité Ennour, Béja 9000").unwrap().name, "Béja");
        // "kefi" is a surname, not Le Kef
        assert!(t.extract_from_text("Cabinet Kefi, rue 5").is_none());
        assert!(t.extract_from_text("").is_none());
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = GovernorateTable::from_centroids(
            vec![
                GovernorateCentroid::new("Sfax", 34.7398, 10.7607),
                GovernorateCentroid::new("SFAX", 34.7406, 10.7603),
            ],
            &TUNISIA_BOUNDS,
        )
        .unwrap_err();
        assert!(matches!(err, GazetteerError::Duplicate { .. }));
    }
}
