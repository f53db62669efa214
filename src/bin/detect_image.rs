//! detect_image - run one image through a detector backend and print the report

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use wildguard::{config::WildguardConfig, BackendRegistry, DetectionReport};

#[derive(Parser, Debug)]
#[command(author, version, about = "Detect wildlife in an image and score crossing risk")]
struct Args {
    /// Image file to analyze.
    image: PathBuf,
    /// Backend to use instead of the configured default (fixture, remote, subprocess).
    #[arg(long, env = "WILDGUARD_BACKEND")]
    backend: Option<String>,
    /// Vehicle speed in km/h to stamp on the report.
    #[arg(long)]
    vehicle_speed: Option<u32>,
    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = WildguardConfig::load()?;
    if let Some(backend) = args.backend {
        config.detector.backend = backend;
        if config.detector.fallback.as_deref() == Some(config.detector.backend.as_str()) {
            config.detector.fallback = None;
        }
    }
    let registry = BackendRegistry::from_settings(&config.detector)?;

    let image = std::fs::read(&args.image)
        .with_context(|| format!("read image {}", args.image.display()))?;
    let output = registry.detect(&image)?;
    let report = DetectionReport::from_predictions(
        output.predictions.predictions(),
        args.vehicle_speed.unwrap_or(config.vehicle_speed),
    )?;
    log::info!("{} detections via {}", report.detections.len(), output.backend);

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}
