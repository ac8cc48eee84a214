//! Address Resolution CLI
//!
//! Resolves business addresses to coordinates and classifies them by distance
//! to the nearest reference branch.
//!
//! Usage:
//!   resolve-addresses --entities data/doctors.csv \
//!                     --references data/branches.csv \
//!                     --network BIAT \
//!                     --output data/doctors_resolved.json --geojson

use address_resolver::export::{self, ResolutionReport};
use address_resolver::{loader, EngineConfig, ResolutionMethod, ResolutionPipeline};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tn_gazetteer::ReferenceTables;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(
    name = "resolve-addresses",
    version,
    about = "Resolve business addresses and classify them by distance to the nearest branch"
)]
struct Args {
    /// Entities to resolve (.json or .csv)
    #[arg(short, long)]
    entities: PathBuf,

    /// Reference points, e.g. bank branches (.json or .csv)
    #[arg(short, long)]
    references: Option<PathBuf>,

    /// Reference tables JSON (built-in Tunisian tables when omitted)
    #[arg(short, long)]
    tables: Option<PathBuf>,

    /// Engine configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file
    #[arg(short, long, default_value = "resolved.json")]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Also write a GeoJSON FeatureCollection next to the output
    #[arg(long)]
    geojson: bool,

    /// Only use reference points with this network flag
    #[arg(short, long)]
    network: Option<String>,

    /// Enable the external lookup tier (Nominatim)
    #[arg(long)]
    external_lookup: bool,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Address Resolution & Proximity Classification");
    info!("{}", "=".repeat(60));

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker threads")?;
    }

    // Configuration, CLI flags override the file
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(network) = &args.network {
        config.reference_network = Some(network.clone());
    }
    if args.external_lookup {
        config.external_lookup.enabled = true;
    }

    // Static tables, validated once before any entity is touched
    let tables = match &args.tables {
        Some(path) => ReferenceTables::load(path, config.bounds)?,
        None => ReferenceTables::builtin_within(config.bounds)?,
    };

    let mut pipeline = ResolutionPipeline::new(&config, tables)?;

    if let Some(path) = &args.references {
        let references = loader::load_references(path)?;
        pipeline = pipeline.with_references(references);
    } else {
        warn!("No reference set given; distances will be infinite and zones unclassified");
    }

    if config.external_lookup.enabled {
        pipeline = attach_external_lookup(pipeline, &config)?;
    }

    // Resolve
    let entities = loader::load_entities(&args.entities)?;
    let records = pipeline.resolve_batch(&entities);
    let report = ResolutionReport::new(records);

    // Write output
    info!("\nWriting output to {:?}", args.output);
    let file = File::create(&args.output)?;
    let writer = BufWriter::new(file);
    match args.format {
        OutputFormat::Json => export::write_json(&report, writer)?,
        OutputFormat::Csv => export::write_csv(&report.records, writer)?,
    }

    // Write GeoJSON if requested
    if args.geojson {
        let geojson_path = args.output.with_extension("geojson");
        info!("Writing GeoJSON to {:?}", geojson_path);
        let geojson = export::to_geojson(&report.records);
        let file = File::create(&geojson_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &geojson)?;
    }

    // Summary
    let meta = &report.metadata;
    info!("\n{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Total entities: {} ({} resolved, {} unresolved)", meta.total, meta.resolved, meta.unresolved);
    info!("By method:");
    for method in ResolutionMethod::ALL {
        let count = meta.by_method.get(method.as_str()).copied().unwrap_or(0);
        info!("  {:22} {}", method.as_str(), count);
    }
    info!("By zone:");
    for zone in pipeline.zone_classifier().zone_names() {
        let count = meta.by_zone.get(zone).copied().unwrap_or(0);
        info!("  {:22} {}", zone, count);
    }
    info!("By confidence band:");
    for (band, count) in &meta.by_confidence_band {
        info!("  {:22} {}", band, count);
    }

    Ok(())
}

#[cfg(feature = "nominatim")]
fn attach_external_lookup(pipeline: ResolutionPipeline, config: &EngineConfig) -> Result<ResolutionPipeline> {
    use address_resolver::nominatim::NominatimClient;
    use std::sync::Arc;

    let client = NominatimClient::new(&config.external_lookup)?;
    info!(
        "External lookup enabled: {} (min interval {} ms, timeout {} s, {} retries)",
        config.external_lookup.endpoint,
        config.external_lookup.min_interval_ms,
        config.external_lookup.timeout_secs,
        config.external_lookup.max_retries
    );
    Ok(pipeline.with_external_geocoder(Arc::new(client)))
}

#[cfg(not(feature = "nominatim"))]
fn attach_external_lookup(pipeline: ResolutionPipeline, _config: &EngineConfig) -> Result<ResolutionPipeline> {
    warn!("External lookup requested but this build has no `nominatim` feature; tier skipped");
    Ok(pipeline)
}
