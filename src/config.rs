use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::{RemoteConfig, SubprocessConfig, KNOWN_BACKENDS, SUBPROCESS_BACKEND};
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::report::DEFAULT_VEHICLE_SPEED;

const DEFAULT_API_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_BACKEND: &str = "remote";
const DEFAULT_FALLBACK_BACKEND: &str = "fixture";

#[derive(Debug, Deserialize, Default)]
struct WildguardConfigFile {
    api: Option<ApiConfigFile>,
    detector: Option<DetectorConfigFile>,
    report: Option<ReportConfigFile>,
    history: Option<HistoryConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ApiConfigFile {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    /// Empty string disables the fallback.
    fallback: Option<String>,
    remote: Option<RemoteConfigFile>,
    subprocess: Option<SubprocessConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct RemoteConfigFile {
    url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct SubprocessConfigFile {
    script: Option<PathBuf>,
    interpreter: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ReportConfigFile {
    vehicle_speed: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct HistoryConfigFile {
    capacity: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct WildguardConfig {
    pub api_addr: String,
    pub max_upload_bytes: usize,
    pub detector: DetectorSettings,
    pub vehicle_speed: u32,
    pub history_capacity: usize,
}

/// Backend selection: which backend runs first, and what to try if it fails.
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub fallback: Option<String>,
    pub remote: RemoteConfig,
    pub subprocess: Option<SubprocessConfig>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            fallback: Some(DEFAULT_FALLBACK_BACKEND.to_string()),
            remote: RemoteConfig::default(),
            subprocess: None,
        }
    }
}

impl WildguardConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("WILDGUARD_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WildguardConfigFile) -> Self {
        let api_addr = file
            .api
            .as_ref()
            .and_then(|api| api.addr.clone())
            .unwrap_or_else(|| DEFAULT_API_ADDR.to_string());
        let max_upload_bytes = file
            .api
            .and_then(|api| api.max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let detector_file = file.detector.unwrap_or_default();
        let defaults = DetectorSettings::default();
        let remote_file = detector_file.remote.unwrap_or_default();
        let remote = RemoteConfig {
            url: remote_file.url.unwrap_or(defaults.remote.url),
            api_key: remote_file.api_key.unwrap_or(defaults.remote.api_key),
            timeout: remote_file
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.remote.timeout),
        };
        let subprocess = detector_file.subprocess.and_then(|sub| {
            sub.script.map(|script| SubprocessConfig {
                script,
                interpreter: sub.interpreter,
            })
        });
        let detector = DetectorSettings {
            backend: detector_file.backend.unwrap_or(defaults.backend),
            fallback: match detector_file.fallback {
                Some(name) => non_empty(name),
                None => defaults.fallback,
            },
            remote,
            subprocess,
        };

        Self {
            api_addr,
            max_upload_bytes,
            detector,
            vehicle_speed: file
                .report
                .and_then(|report| report.vehicle_speed)
                .unwrap_or(DEFAULT_VEHICLE_SPEED),
            history_capacity: file
                .history
                .and_then(|history| history.capacity)
                .unwrap_or(DEFAULT_HISTORY_CAPACITY),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("WILDGUARD_API_ADDR") {
            if !addr.trim().is_empty() {
                self.api_addr = addr;
            }
        }
        if let Ok(backend) = std::env::var("WILDGUARD_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_string();
            }
        }
        if let Ok(fallback) = std::env::var("WILDGUARD_FALLBACK_BACKEND") {
            self.detector.fallback = non_empty(fallback);
        }
        if let Ok(url) = std::env::var("WILDGUARD_REMOTE_URL") {
            if !url.trim().is_empty() {
                self.detector.remote.url = url;
            }
        }
        if let Ok(key) = std::env::var("WILDGUARD_REMOTE_API_KEY") {
            if !key.trim().is_empty() {
                self.detector.remote.api_key = key;
            }
        }
        if let Ok(timeout) = std::env::var("WILDGUARD_REMOTE_TIMEOUT_SECS") {
            let secs: u64 = timeout.parse().map_err(|_| {
                anyhow!("WILDGUARD_REMOTE_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.detector.remote.timeout = Duration::from_secs(secs);
        }
        if let Ok(script) = std::env::var("WILDGUARD_SCRIPT_PATH") {
            if !script.trim().is_empty() {
                let interpreter = self
                    .detector
                    .subprocess
                    .take()
                    .and_then(|sub| sub.interpreter);
                self.detector.subprocess = Some(SubprocessConfig {
                    script: PathBuf::from(script),
                    interpreter,
                });
            }
        }
        if let Ok(interpreter) = std::env::var("WILDGUARD_SCRIPT_INTERPRETER") {
            if let Some(sub) = self.detector.subprocess.as_mut() {
                sub.interpreter = non_empty(interpreter);
            }
        }
        if let Ok(speed) = std::env::var("WILDGUARD_VEHICLE_SPEED") {
            self.vehicle_speed = speed
                .parse()
                .map_err(|_| anyhow!("WILDGUARD_VEHICLE_SPEED must be an integer km/h"))?;
        }
        if let Ok(limit) = std::env::var("WILDGUARD_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit
                .parse()
                .map_err(|_| anyhow!("WILDGUARD_MAX_UPLOAD_BYTES must be an integer"))?;
        }
        if let Ok(capacity) = std::env::var("WILDGUARD_HISTORY_CAPACITY") {
            self.history_capacity = capacity
                .parse()
                .map_err(|_| anyhow!("WILDGUARD_HISTORY_CAPACITY must be an integer"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.detector.validate()?;
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        if self.history_capacity == 0 {
            return Err(anyhow!("history capacity must be greater than zero"));
        }
        Ok(())
    }
}

impl DetectorSettings {
    pub fn validate(&self) -> Result<()> {
        ensure_known_backend(&self.backend)?;
        if let Some(fallback) = &self.fallback {
            ensure_known_backend(fallback)?;
            if fallback == &self.backend {
                return Err(anyhow!(
                    "fallback backend '{}' is the same as the primary backend",
                    fallback
                ));
            }
        }
        let wants_subprocess = self.backend == SUBPROCESS_BACKEND
            || self.fallback.as_deref() == Some(SUBPROCESS_BACKEND);
        if wants_subprocess && self.subprocess.is_none() {
            return Err(anyhow!(
                "subprocess backend selected but no detector script configured"
            ));
        }
        if self.remote.timeout.is_zero() {
            return Err(anyhow!("remote detector timeout must be greater than zero"));
        }
        Ok(())
    }
}

fn ensure_known_backend(name: &str) -> Result<()> {
    if KNOWN_BACKENDS.contains(&name) {
        Ok(())
    } else {
        Err(anyhow!(
            "unknown detector backend '{}'; expected one of {}",
            name,
            KNOWN_BACKENDS.join(", ")
        ))
    }
}

fn read_config_file(path: &Path) -> Result<WildguardConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: WildguardConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
