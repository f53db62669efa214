//! wildguard_api - detection service for WildGuard
//!
//! This daemon:
//! 1. Loads configuration (WILDGUARD_CONFIG file + environment)
//! 2. Builds the detector backend registry
//! 3. Serves the detection API until Ctrl-C

use anyhow::Result;
use std::sync::mpsc;

use wildguard::{
    api::{ApiConfig, ApiServer},
    config::WildguardConfig,
    BackendRegistry,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = WildguardConfig::load()?;
    let registry = BackendRegistry::from_settings(&config.detector)?;
    if let Err(err) = registry.warm_up() {
        log::warn!("detector warm-up failed: {:#}", err);
    }
    log::info!(
        "detector backend '{}' (fallback: {}), registered: {}",
        config.detector.backend,
        config.detector.fallback.as_deref().unwrap_or("none"),
        registry.list().join(", ")
    );

    let api_handle = ApiServer::new(ApiConfig::from(&config), registry).spawn()?;
    log::info!("detection api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("wildguard_api waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}
