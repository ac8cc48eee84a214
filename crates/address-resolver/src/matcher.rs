//! Address matcher: ordered resolution tiers
//!
//! Each tier is a tagged strategy evaluated uniformly; the matcher walks them
//! in order and stops at the first in-bounds anchor. A tier that produces a
//! coordinate outside the national box counts as a miss for that tier only.

use crate::geocoder::{build_query, is_well_formed, ExternalGeocoder};
use crate::{AddressableEntity, ResolutionMethod, ResolverError, Result};
use std::fmt;
use std::sync::Arc;
use tn_gazetteer::{normalize_optional, BoundingBox, Coordinate, ReferenceTables};
use tracing::{debug, warn};

/// `matched_on` value for external lookups
pub const EXTERNAL_SOURCE: &str = "external";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    ShortGeocode,
    Pattern,
    ExternalLookup,
    GovernorateFallback,
}

impl Tier {
    pub const DEFAULT_ORDER: [Tier; 4] = [
        Tier::ShortGeocode,
        Tier::Pattern,
        Tier::ExternalLookup,
        Tier::GovernorateFallback,
    ];

    pub fn method(&self) -> ResolutionMethod {
        match self {
            Self::ShortGeocode => ResolutionMethod::ShortGeocodeMatch,
            Self::Pattern => ResolutionMethod::PatternMatch,
            Self::ExternalLookup => ResolutionMethod::ExternalLookup,
            Self::GovernorateFallback => ResolutionMethod::GovernorateFallback,
        }
    }
}

/// A tier hit, before confidence and jitter are applied
#[derive(Debug, Clone, PartialEq)]
pub struct TierMatch {
    pub method: ResolutionMethod,
    pub anchor: Coordinate,
    pub matched_on: String,
    /// Bounding zone of the matched gazetteer entry, if it has one
    pub zone: Option<BoundingBox>,
}

/// Anchor, matched source and the entry's bounding zone
type Anchor = (Coordinate, String, Option<BoundingBox>);

/// Matcher inputs derived from one entity
#[derive(Debug, Clone, Default)]
pub struct MatchQuery<'a> {
    pub raw_address: Option<&'a str>,
    /// Normalized address alone
    pub normalized_address: String,
    /// Normalized address followed by the normalized delegation
    pub scan_text: String,
    pub region_hint: Option<&'a str>,
    pub short_geocode_token: Option<&'a str>,
    /// Gazetteer layers the entity's category scans; `None` means all
    pub layers: Option<&'a [String]>,
}

impl<'a> MatchQuery<'a> {
    pub fn from_entity(entity: &'a AddressableEntity, layers: Option<&'a [String]>) -> Self {
        let raw_address = non_blank(entity.raw_address.as_deref());
        let normalized_address = normalize_optional(raw_address).unwrap_or_default();
        let scan_text = match normalize_optional(entity.delegation.as_deref()) {
            Some(delegation) if normalized_address.is_empty() => delegation,
            Some(delegation) => format!("{} {}", normalized_address, delegation),
            None => normalized_address.clone(),
        };

        Self {
            raw_address,
            normalized_address,
            scan_text,
            region_hint: non_blank(entity.region_hint.as_deref()),
            short_geocode_token: non_blank(entity.short_geocode_token.as_deref()),
            layers,
        }
    }

    /// Address, hint and token all absent
    pub fn is_empty(&self) -> bool {
        self.scan_text.is_empty() && self.region_hint.is_none() && self.short_geocode_token.is_none()
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Walks the tiers over a frozen set of reference tables
#[derive(Clone)]
pub struct AddressMatcher {
    tables: ReferenceTables,
    tiers: Vec<Tier>,
    geocoder: Option<Arc<dyn ExternalGeocoder>>,
}

impl fmt::Debug for AddressMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressMatcher")
            .field("tiers", &self.tiers)
            .field("patterns", &self.tables.gazetteer.len())
            .field("external_geocoder", &self.geocoder.is_some())
            .finish()
    }
}

impl AddressMatcher {
    pub fn new(tables: ReferenceTables) -> Self {
        Self {
            tables,
            tiers: Tier::DEFAULT_ORDER.to_vec(),
            geocoder: None,
        }
    }

    /// Keep only the given tiers. They must appear in [`Tier::DEFAULT_ORDER`]
    /// order without repeats; tiers can be dropped, never reordered.
    pub fn with_tiers(mut self, tiers: Vec<Tier>) -> Result<Self> {
        let mut remaining = Tier::DEFAULT_ORDER.iter();
        for tier in &tiers {
            if !remaining.any(|t| t == tier) {
                return Err(ResolverError::Config(format!(
                    "tier {:?} is repeated or out of priority order in {:?}",
                    tier, tiers
                )));
            }
        }
        self.tiers = tiers;
        Ok(self)
    }

    /// Enable the external lookup tier
    pub fn with_external_geocoder(mut self, geocoder: Arc<dyn ExternalGeocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// First tier producing an in-bounds anchor, or `None` when unresolved
    pub fn resolve(&self, query: &MatchQuery<'_>) -> Option<TierMatch> {
        if query.is_empty() {
            return None;
        }

        for tier in &self.tiers {
            let Some(hit) = self.attempt(*tier, query) else {
                continue;
            };
            if self.tables.bounds.contains(&hit.anchor) && hit.anchor.is_valid() {
                debug!("{:?} matched on '{}'", tier, hit.matched_on);
                return Some(hit);
            }
            warn!(
                "{:?} result for '{}' at ({}, {}) is outside national bounds, falling through",
                tier, hit.matched_on, hit.anchor.latitude, hit.anchor.longitude
            );
        }
        None
    }

    fn attempt(&self, tier: Tier, query: &MatchQuery<'_>) -> Option<TierMatch> {
        let (anchor, matched_on, zone) = match tier {
            Tier::ShortGeocode => self.match_short_geocode(query),
            Tier::Pattern => self.match_pattern(query),
            Tier::ExternalLookup => self.match_external(query),
            Tier::GovernorateFallback => self.match_governorate(query),
        }?;
        Some(TierMatch {
            method: tier.method(),
            anchor,
            matched_on,
            zone,
        })
    }

    fn match_short_geocode(&self, query: &MatchQuery<'_>) -> Option<Anchor> {
        let code = self.tables.short_geocodes.get(query.short_geocode_token?)?;
        Some((code.anchor, code.token.clone(), None))
    }

    fn match_pattern(&self, query: &MatchQuery<'_>) -> Option<Anchor> {
        let entry = self.tables.gazetteer.find_in(&query.scan_text, query.layers)?;
        Some((entry.anchor, entry.pattern.clone(), entry.zone))
    }

    fn match_external(&self, query: &MatchQuery<'_>) -> Option<Anchor> {
        let geocoder = self.geocoder.as_ref()?;
        let raw = query.raw_address?;
        if !is_well_formed(&query.normalized_address) {
            return None;
        }

        let q = build_query(raw);
        match geocoder.lookup(&q) {
            Ok(Some(anchor)) => Some((anchor, EXTERNAL_SOURCE.to_string(), None)),
            Ok(None) => {
                debug!("External lookup found nothing for '{}'", q);
                None
            }
            Err(e) => {
                warn!("External lookup failed for '{}': {}", q, e);
                None
            }
        }
    }

    fn match_governorate(&self, query: &MatchQuery<'_>) -> Option<Anchor> {
        let governorates = &self.tables.governorates;
        let found = query
            .region_hint
            .and_then(|hint| governorates.lookup_hint(hint))
            .or_else(|| governorates.extract_from_text(&query.scan_text))?;
        Some((found.centroid, found.name.clone(), None))
    }
}
