//! Resolution pipeline
//!
//! matcher -> confidence -> jitter -> locator -> zone / catchment.
//! Built once from a validated [`EngineConfig`] and frozen tables, then shared
//! read-only by every worker.

use crate::catchment::CatchmentClassifier;
use crate::classifier::ZoneClassifier;
use crate::confidence::ConfidenceScale;
use crate::config::EngineConfig;
use crate::geocoder::ExternalGeocoder;
use crate::jitter::{self, JitterConfig};
use crate::locator::{NearestReference, NearestReferenceLocator, ReferencePoint};
use crate::matcher::{AddressMatcher, MatchQuery, Tier};
use crate::{AddressableEntity, ResolutionMethod, ResolvedLocation, ResolverError, Result};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tn_gazetteer::{normalize_text, ReferenceTables};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ResolutionPipeline {
    matcher: AddressMatcher,
    confidence: ConfidenceScale,
    jitter: JitterConfig,
    /// `None` until a reference set is supplied
    locator: Option<NearestReferenceLocator>,
    reference_network: Option<String>,
    zones: ZoneClassifier,
    catchments: CatchmentClassifier,
    /// Normalized category tag -> layers
    profiles: BTreeMap<String, Vec<String>>,
}

impl ResolutionPipeline {
    /// Validate `config` and freeze it together with `tables`.
    ///
    /// Tables must have been validated against the same national box as the config.
    pub fn new(config: &EngineConfig, tables: ReferenceTables) -> Result<Self> {
        config.validate()?;
        if tables.bounds != config.bounds {
            return Err(ResolverError::Config(
                "reference tables were validated against different national bounds".into(),
            ));
        }

        let profiles = config.normalized_profiles();
        let known: HashSet<&str> = tables.gazetteer.layers().into_iter().collect();
        for (category, layers) in &profiles {
            for layer in layers.iter().filter(|l| !known.contains(l.as_str())) {
                warn!("Category '{}' scans layer '{}' which has no gazetteer entries", category, layer);
            }
        }

        info!(
            "Pipeline ready: {} zones, {} catchments, {} category profiles",
            config.zones.len() + 1,
            config.catchments.areas.len(),
            profiles.len()
        );

        Ok(Self {
            matcher: AddressMatcher::new(tables),
            confidence: config.confidence,
            jitter: config.jitter,
            locator: None,
            reference_network: config.reference_network.clone(),
            zones: config.zone_classifier()?,
            catchments: config.catchment_classifier()?,
            profiles,
        })
    }

    /// Attach the reference network, filtered by the configured network flag
    pub fn with_references(mut self, points: Vec<ReferencePoint>) -> Self {
        let locator = match &self.reference_network {
            Some(network) => NearestReferenceLocator::for_network(points, network),
            None => NearestReferenceLocator::new(points),
        };
        if locator.is_empty() {
            warn!("Reference set is empty; every record will be unclassified");
        }
        self.locator = Some(locator);
        self
    }

    /// Enable the external lookup tier
    pub fn with_external_geocoder(mut self, geocoder: Arc<dyn ExternalGeocoder>) -> Self {
        self.matcher = self.matcher.with_external_geocoder(geocoder);
        self
    }

    /// Drop tiers; see [`AddressMatcher::with_tiers`]
    pub fn with_tiers(mut self, tiers: Vec<Tier>) -> Result<Self> {
        self.matcher = self.matcher.with_tiers(tiers)?;
        Ok(self)
    }

    pub fn matcher(&self) -> &AddressMatcher {
        &self.matcher
    }

    pub fn locator(&self) -> Option<&NearestReferenceLocator> {
        self.locator.as_ref()
    }

    pub fn zone_classifier(&self) -> &ZoneClassifier {
        &self.zones
    }

    /// Layers scanned for `category`; `None` (all layers) when it has no profile
    pub fn layers_for(&self, category: &str) -> Option<&[String]> {
        self.profiles.get(&normalize_text(category)).map(Vec::as_slice)
    }

    /// Resolve one entity. Never fails: misses come back as `unresolved`.
    pub fn resolve(&self, entity: &AddressableEntity) -> ResolvedLocation {
        let query = MatchQuery::from_entity(entity, self.layers_for(&entity.category));
        let bounds = &self.matcher.tables().bounds;

        let (method, coordinate, matched_on) = match self.matcher.resolve(&query) {
            Some(hit) => {
                let placed = jitter::apply(
                    hit.anchor,
                    self.jitter.radius(hit.method),
                    &entity.id,
                    &query.normalized_address,
                    hit.zone.as_ref(),
                    bounds,
                );
                (hit.method, Some(placed), Some(hit.matched_on))
            }
            None => (ResolutionMethod::Unresolved, None, None),
        };

        let nearest = match &self.locator {
            Some(locator) => locator.nearest(coordinate.as_ref()),
            None => NearestReference::none(),
        };
        let zone = self.zones.classify(nearest.distance_km).to_string();
        let catchment = self.catchments.classify(coordinate.as_ref()).to_string();
        let confidence = self.confidence.score(method);

        debug!(
            "Resolved {}: {} ({:.2}) via {:?}, nearest={:?} {:.3} km, zone={}",
            entity.id,
            method,
            confidence,
            matched_on,
            nearest.id(),
            nearest.distance_km,
            zone
        );

        ResolvedLocation {
            entity: entity.clone(),
            latitude: coordinate.map(|c| c.latitude),
            longitude: coordinate.map(|c| c.longitude),
            confidence,
            resolution_method: method,
            matched_on,
            nearest_reference_id: nearest.id().map(str::to_string),
            distance_km: nearest.distance_km,
            zone,
            catchment,
        }
    }

    /// Resolve every entity in parallel; output order matches input order
    pub fn resolve_batch(&self, entities: &[AddressableEntity]) -> Vec<ResolvedLocation> {
        entities.par_iter().map(|e| self.resolve(e)).collect()
    }

    /// Like [`resolve_batch`](Self::resolve_batch), but entities not yet started
    /// when `cancel` is raised are left out. Returned records are complete and
    /// keep input order.
    pub fn resolve_batch_cancellable(
        &self,
        entities: &[AddressableEntity],
        cancel: &AtomicBool,
    ) -> Vec<ResolvedLocation> {
        let records: Vec<ResolvedLocation> = entities
            .par_iter()
            .filter_map(|e| {
                if cancel.load(Ordering::Relaxed) {
                    None
                } else {
                    Some(self.resolve(e))
                }
            })
            .collect();

        if records.len() < entities.len() {
            info!("Cancelled: {} of {} entities resolved", records.len(), entities.len());
        }
        records
    }
}
