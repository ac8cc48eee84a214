//! End-to-end resolution scenarios over the built-in Tunisian tables

use address_resolver::confidence::ConfidenceBand;
use address_resolver::export::{self, ResolutionReport};
use address_resolver::geocoder::RetryPolicy;
use address_resolver::{
    loader, AddressableEntity, EngineConfig, ExternalGeocoder, LookupError, ReferencePoint,
    ResolutionMethod, ResolutionPipeline, ResolverError, ZoneThreshold,
};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::Builder;
use tn_gazetteer::{haversine_km, Coordinate, ReferenceTables};

const BOURGUIBA: Coordinate = Coordinate::new(36.8008, 10.1817);
const ARIANA_CENTROID: Coordinate = Coordinate::new(36.8665, 10.1965);

fn make_pipeline(config: &EngineConfig) -> ResolutionPipeline {
    ResolutionPipeline::new(config, ReferenceTables::builtin().unwrap()).unwrap()
}

fn make_branches() -> Vec<ReferencePoint> {
    vec![
        ReferencePoint::new("biat-001", "BIAT Habib Bourguiba", 36.8008, 10.1817).with_network("BIAT"),
        ReferencePoint::new("biat-002", "BIAT Ariana", 36.8625, 10.1956).with_network("BIAT"),
        ReferencePoint::new("biat-003", "BIAT Sfax", 34.7406, 10.7603).with_network("BIAT"),
    ]
}

/// Geocoder that fails with a transient error a fixed number of times
struct FlakyGeocoder {
    failures: usize,
    answer: Coordinate,
    calls: AtomicUsize,
    retry: RetryPolicy,
}

impl FlakyGeocoder {
    fn new(failures: usize, answer: Coordinate, max_retries: u32) -> Arc<Self> {
        Arc::new(Self {
            failures,
            answer,
            calls: AtomicUsize::new(0),
            retry: RetryPolicy {
                max_retries,
                backoff_base: Duration::from_millis(1),
                backoff_max: Duration::from_millis(4),
            },
        })
    }
}

impl ExternalGeocoder for FlakyGeocoder {
    fn lookup(&self, _query: &str) -> Result<Option<Coordinate>, LookupError> {
        self.retry.run(|_| {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(LookupError::Timeout)
            } else {
                Ok(Some(self.answer))
            }
        })
    }
}

#[test]
fn test_bourguiba_pattern_match() {
    let pipeline = make_pipeline(&EngineConfig::default());
    let entity = AddressableEntity::new("doc-1", "doctor").with_address("Cabinet, 45 AVENUE HABIB BOURGUIBA");

    let r = pipeline.resolve(&entity);
    assert_eq!(r.resolution_method, ResolutionMethod::PatternMatch);
    assert_eq!(ConfidenceBand::of(r.confidence), ConfidenceBand::High);

    let c = r.coordinate().unwrap();
    let d = haversine_km(c.latitude, c.longitude, BOURGUIBA.latitude, BOURGUIBA.longitude);
    assert!(d < 1.0, "{} km from Avenue Habib Bourguiba", d);
}

#[test]
fn test_all_inputs_absent() {
    let pipeline = make_pipeline(&EngineConfig::default()).with_references(make_branches());
    let r = pipeline.resolve(&AddressableEntity::new("x-1", "pharmacy"));

    assert_eq!(r.resolution_method, ResolutionMethod::Unresolved);
    assert_eq!(r.confidence, 0.0);
    assert!(r.latitude.is_none() && r.longitude.is_none());
    assert!(r.nearest_reference_id.is_none());
    assert_eq!(r.distance_km, f64::INFINITY);
    assert_eq!(r.zone, "unclassified");
    assert_eq!(r.catchment, "unknown");
}

#[test]
fn test_five_km_is_near() {
    let default_zones = EngineConfig::default().zone_classifier().unwrap();
    assert_eq!(default_zones.classify(5.0), "near");
    assert_eq!(default_zones.classify(15.0), "mid");

    // Through the pipeline: threshold set to the exact distance of the match
    let anchor = Coordinate::new(36.8290, 10.1485); // V5H9+JPG
    let branch = ReferencePoint::new("b-1", "Branch", 36.8740, 10.1485);
    let exact = anchor.distance_km(&branch.coordinate);

    let config = EngineConfig {
        zones: vec![ZoneThreshold::new(exact, "near"), ZoneThreshold::new(exact + 10.0, "mid")],
        ..EngineConfig::default()
    };
    let pipeline = make_pipeline(&config).with_references(vec![branch]);
    let r = pipeline.resolve(&AddressableEntity::new("a-1", "advisor").with_short_geocode("V5H9+JPG"));
    assert_eq!(r.distance_km, exact);
    assert_eq!(r.zone, "near");
}

#[test]
fn test_empty_reference_set() {
    let pipeline = make_pipeline(&EngineConfig::default()).with_references(Vec::new());
    let r = pipeline.resolve(&AddressableEntity::new("a-1", "advisor").with_short_geocode("V5JG+XQ2"));

    assert_eq!(r.resolution_method, ResolutionMethod::ShortGeocodeMatch);
    assert!(r.confidence > 0.9);
    assert_eq!(r.distance_km, f64::INFINITY);
    assert_eq!(r.zone, "unclassified");
}

#[test]
fn test_ariana_hint_fallback() {
    let pipeline = make_pipeline(&EngineConfig::default());
    let entity = AddressableEntity::new("ph-9", "pharmacy")
        .with_address("Immeuble Yasmine, 3ème étage")
        .with_region_hint("l'Ariana");

    let r = pipeline.resolve(&entity);
    assert_eq!(r.resolution_method, ResolutionMethod::GovernorateFallback);
    assert_eq!(r.matched_on.as_deref(), Some("Ariana"));
    assert_eq!(ConfidenceBand::of(r.confidence), ConfidenceBand::Medium);

    let c = r.coordinate().unwrap();
    assert!((c.latitude - ARIANA_CENTROID.latitude).abs() <= 0.001);
    assert!((c.longitude - ARIANA_CENTROID.longitude).abs() <= 0.001);
}

#[test]
fn test_short_geocode_never_falls_back() {
    let pipeline = make_pipeline(&EngineConfig::default());
    let entity = AddressableEntity::new("a-1", "accountant")
        .with_address("Avenue Habib Bourguiba Sfax")
        .with_region_hint("Sousse")
        .with_short_geocode("V5JH+QPX");
    let r = pipeline.resolve(&entity);
    assert_eq!(r.resolution_method, ResolutionMethod::ShortGeocodeMatch);
    assert_eq!(r.coordinate(), Some(Coordinate::new(36.8347, 10.1800)));
}

#[test]
fn test_rerun_is_identical() {
    let config = EngineConfig::default();
    let entities = vec![
        AddressableEntity::new("1", "doctor").with_address("Clinique La Rose, Tunis"),
        AddressableEntity::new("2", "pharmacy").with_address("Rue de Marseille").with_region_hint("Tunis"),
        AddressableEntity::new("3", "advisor").with_region_hint("Mannouba"),
        AddressableEntity::new("4", "accountant"),
    ];

    let first = make_pipeline(&config).with_references(make_branches()).resolve_batch(&entities);
    let second = make_pipeline(&config).with_references(make_branches()).resolve_batch(&entities);
    assert_eq!(first, second);
}

#[test]
fn test_external_lookup_retries_then_resolves() {
    let geocoder = FlakyGeocoder::new(2, Coordinate::new(36.8460, 10.1980), 3);
    let pipeline = make_pipeline(&EngineConfig::default())
        .with_external_geocoder(geocoder.clone())
        .with_references(make_branches());

    let entity = AddressableEntity::new("d-7", "doctor")
        .with_address("27 Rue Ibn Khaldoun")
        .with_region_hint("Ariana");
    let r = pipeline.resolve(&entity);

    assert_eq!(r.resolution_method, ResolutionMethod::ExternalLookup);
    assert_eq!(r.confidence, 0.75);
    assert_eq!(r.coordinate(), Some(Coordinate::new(36.8460, 10.1980)));
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_external_lookup_exhausted_falls_back() {
    let geocoder = FlakyGeocoder::new(10, Coordinate::new(36.8460, 10.1980), 2);
    let pipeline = make_pipeline(&EngineConfig::default()).with_external_geocoder(geocoder.clone());

    let entity = AddressableEntity::new("d-8", "doctor")
        .with_address("27 Rue Ibn Khaldoun")
        .with_region_hint("Ariana");
    let r = pipeline.resolve(&entity);

    assert_eq!(r.resolution_method, ResolutionMethod::GovernorateFallback);
    assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_invalid_thresholds_halt_before_resolution() {
    let config = EngineConfig {
        zones: vec![ZoneThreshold::new(15.0, "mid"), ZoneThreshold::new(5.0, "near")],
        ..EngineConfig::default()
    };
    let err = ResolutionPipeline::new(&config, ReferenceTables::builtin().unwrap()).unwrap_err();
    assert!(matches!(err, ResolverError::Config(_)));
}

#[test]
fn test_files_end_to_end() {
    let mut entities = Builder::new().suffix(".csv").tempfile().unwrap();
    write!(
        entities,
        "id,raw_address,region_hint,short_geocode_token,category,name,delegation\n\
         d-1,Centre Médical Ibn Ennafis,Ariana,,doctor,Dr Trabelsi,\n\
         d-2,,Sfax,,doctor,Dr Gharbi,\n\
         a-3,,,V5H9+JPG,advisor,Cabinet Jaziri,\n\
         p-4,,,,pharmacy,Pharmacie X,\n"
    )
    .unwrap();

    let mut references = Builder::new().suffix(".csv").tempfile().unwrap();
    write!(
        references,
        "id,name,lat,lon,network\n\
         biat-001,BIAT Bourguiba,36.8008,10.1817,BIAT\n\
         stb-001,STB Menzah,36.8567,10.1834,STB\n"
    )
    .unwrap();

    let config = EngineConfig {
        reference_network: Some("BIAT".to_string()),
        ..EngineConfig::default()
    };
    let pipeline = make_pipeline(&config).with_references(loader::load_references(references.path()).unwrap());
    let records = pipeline.resolve_batch(&loader::load_entities(entities.path()).unwrap());

    let methods: Vec<_> = records.iter().map(|r| r.resolution_method).collect();
    assert_eq!(
        methods,
        vec![
            ResolutionMethod::PatternMatch,
            ResolutionMethod::GovernorateFallback,
            ResolutionMethod::ShortGeocodeMatch,
            ResolutionMethod::Unresolved,
        ]
    );
    assert!(records[..3].iter().all(|r| r.nearest_reference_id.as_deref() == Some("biat-001")));
    assert_eq!(records[1].zone, "far");

    let report = ResolutionReport::new(records);
    assert_eq!(report.metadata.by_method["unresolved"], 1);

    let mut out = Vec::new();
    export::write_csv(&report.records, &mut out).unwrap();
    let back = export::read_csv(out.as_slice()).unwrap();
    assert_eq!(back.len(), 4);
    assert!(back[3].distance_km.is_infinite());
}
