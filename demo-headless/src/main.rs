//! Headless runner: one detection cycle from a scenario file, report on stdout
#![deny(unused_crate_dependencies)]

use anyhow::{Context, Result};
use clap::Parser;
use ecoflare_core::attribution::{
    AttributionClassifier, CauseModel, FireObservation, ForestModel, ReferenceLayerSpec,
    ReferenceLayers,
};
use ecoflare_core::spread::{LinearSpreadModel, SpreadRateModel};
use ecoflare_core::{Pipeline, PipelineConfig, SignalBundle, SpreadInputs};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run one wildfire detection cycle from a scenario file
#[derive(Parser, Debug)]
#[command(name = "ecoflare-headless")]
#[command(
    about = "Headless wildfire detection, attribution and spread forecast",
    long_about = None
)]
struct Args {
    /// Scenario JSON (signals, observation, spread inputs, reference layers)
    #[arg(short, long)]
    scenario: PathBuf,

    /// Pipeline configuration JSON
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Trained cause classifier artifact (forest JSON)
    #[arg(long)]
    cause_model: Option<PathBuf>,

    /// Trained spread-rate artifact (linear model JSON)
    #[arg(long)]
    spread_model: Option<PathBuf>,

    /// Forecast horizon in hours (1-24), overrides config and scenario
    #[arg(long)]
    horizon: Option<u32>,

    /// Pretty-print the report
    #[arg(short, long)]
    pretty: bool,
}

/// Everything one cycle needs, as read from disk.
#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    signals: SignalBundle,
    observation: FireObservation,
    #[serde(default)]
    spread: Option<SpreadInputs>,
    #[serde(default)]
    layers: ReferenceLayerSpec,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ecoflare_core=info,ecoflare_headless=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    let scenario: Scenario = read_json(&args.scenario)?;
    let layers = ReferenceLayers::build(scenario.layers, config.enrichment.grid_cell_km)
        .context("building reference layers")?;

    let classifier = match load_cause_model(args.cause_model.as_deref()) {
        Some(model) => AttributionClassifier::load(model, &config.classifier)
            .unwrap_or_else(|err| {
                warn!(error = %err, "cause model rejected, using rule attribution");
                AttributionClassifier::rules_only(&config.classifier)
            }),
        None => AttributionClassifier::rules_only(&config.classifier),
    };
    let spread_model = load_spread_model(args.spread_model.as_deref());

    let pipeline = Pipeline::new(Arc::new(layers), classifier, spread_model, config)
        .context("assembling pipeline")?;

    let spread = scenario.spread.map(|mut inputs| {
        if let Some(horizon) = args.horizon {
            inputs.horizon_hours = Some(horizon);
        }
        inputs
    });

    info!(scenario = %args.scenario.display(), "running detection cycle");
    let report = pipeline
        .run_cycle(&scenario.signals, &scenario.observation, spread.as_ref())
        .context("running detection cycle")?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// A missing or corrupt artifact degrades to the rule path.
fn load_cause_model(path: Option<&Path>) -> Option<Arc<dyn CauseModel>> {
    let path = path?;
    match ForestModel::load(path) {
        Ok(model) => Some(Arc::new(model) as Arc<dyn CauseModel>),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cause model unavailable");
            None
        }
    }
}

/// A missing or corrupt artifact degrades to physics-only forecasts.
fn load_spread_model(path: Option<&Path>) -> Option<Arc<dyn SpreadRateModel>> {
    let path = path?;
    match LinearSpreadModel::load(path) {
        Ok(model) => Some(Arc::new(model) as Arc<dyn SpreadRateModel>),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "spread model unavailable");
            None
        }
    }
}
