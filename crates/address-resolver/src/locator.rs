//! Nearest-reference locator (haversine over the reference network)

use serde::{Deserialize, Serialize};
use tn_gazetteer::{normalize_tag, Coordinate};
use tracing::info;

/// Distances closer than this to the running minimum count as ties
pub const TIE_TOLERANCE_KM: f64 = 1e-9;

/// One node of the comparison network (a bank branch, a competitor branch)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl ReferencePoint {
    pub fn new(id: &str, name: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(latitude, longitude),
            network: None,
        }
    }

    pub fn with_network(mut self, network: &str) -> Self {
        self.network = Some(network.to_string());
        self
    }

    /// Case-insensitive network flag comparison
    pub fn in_network(&self, network: &str) -> bool {
        self.network
            .as_deref()
            .is_some_and(|n| normalize_tag(n) == normalize_tag(network))
    }
}

/// Result of a nearest-point query
#[derive(Debug, Clone, PartialEq)]
pub struct NearestReference<'a> {
    pub point: Option<&'a ReferencePoint>,
    /// `+inf` when there is no coordinate or no reference point
    pub distance_km: f64,
}

impl NearestReference<'_> {
    pub fn none() -> Self {
        NearestReference {
            point: None,
            distance_km: f64::INFINITY,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.point.map(|p| p.id.as_str())
    }
}

/// Read-only reference set, in load order
#[derive(Debug, Clone, Default)]
pub struct NearestReferenceLocator {
    points: Vec<ReferencePoint>,
}

impl NearestReferenceLocator {
    pub fn new(points: Vec<ReferencePoint>) -> Self {
        Self { points }
    }

    /// Keep only points flagged with `network` (case-insensitive)
    pub fn for_network(points: Vec<ReferencePoint>, network: &str) -> Self {
        let total = points.len();
        let points: Vec<_> = points.into_iter().filter(|p| p.in_network(network)).collect();
        info!(
            "Reference network '{}': {} of {} points kept",
            network,
            points.len(),
            total
        );
        Self { points }
    }

    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closest point to `location`. The first point encountered wins ties.
    pub fn nearest(&self, location: Option<&Coordinate>) -> NearestReference<'_> {
        let Some(location) = location else {
            return NearestReference::none();
        };

        let mut best = NearestReference::none();
        for point in &self.points {
            let d = location.distance_km(&point.coordinate);
            if d.is_nan() {
                continue;
            }
            if best.point.is_none() || d < best.distance_km - TIE_TOLERANCE_KM {
                best = NearestReference {
                    point: Some(point),
                    distance_km: d,
                };
            }
        }
        best
    }

    /// Points within `radius_km` of `location`, closest first (ties keep set order)
    pub fn within_radius(&self, location: &Coordinate, radius_km: f64) -> Vec<(&ReferencePoint, f64)> {
        let mut hits: Vec<(&ReferencePoint, f64)> = self
            .points
            .iter()
            .map(|p| (p, location.distance_km(&p.coordinate)))
            .filter(|(_, d)| *d <= radius_km)
            .collect();
        // Stable sort keeps set order among equal distances
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }
}
