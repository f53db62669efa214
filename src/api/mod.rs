//! Detection HTTP API.
//!
//! A small HTTP/1.1 server on its own thread. Connections are served one at a
//! time; the session history lives on the server thread.
//!
//! Routes:
//! - `GET /health`
//! - `POST /api/detect` (multipart field `file`, or a raw `image/*` body)
//! - `GET /api/detections`, `GET /api/detections/latest`

mod http;
mod multipart;

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::alerts::{alerts_for, billboard_for, ticker_active, Alert, Billboard};
use crate::config::WildguardConfig;
use crate::detect::BackendRegistry;
use crate::history::{image_digest, DetectionHistory, DEFAULT_HISTORY_CAPACITY};
use crate::report::{DetectionReport, DEFAULT_VEHICLE_SPEED};

use http::{read_request_head, write_json_response, write_response, HttpRequest};
use multipart::{boundary_from_content_type, parse_multipart};

const DETECTION_FAILED: &str = r#"{"error":"Detection failed"}"#;

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
    /// Vehicle speed stamped on reports when the request does not give one.
    pub vehicle_speed: u32,
    pub history_capacity: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8787".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            vehicle_speed: DEFAULT_VEHICLE_SPEED,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl From<&WildguardConfig> for ApiConfig {
    fn from(cfg: &WildguardConfig) -> Self {
        Self {
            addr: cfg.api_addr.clone(),
            max_upload_bytes: cfg.max_upload_bytes,
            vehicle_speed: cfg.vehicle_speed,
            history_capacity: cfg.history_capacity,
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    registry: BackendRegistry,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, registry: BackendRegistry) -> Self {
        Self { cfg, registry }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "api configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let mut state = ServerState {
            history: DetectionHistory::new(self.cfg.history_capacity),
            cfg: self.cfg,
            registry: self.registry,
        };
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, &mut state, shutdown_thread) {
                log::error!("detection api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

struct ServerState {
    cfg: ApiConfig,
    registry: BackendRegistry,
    history: DetectionHistory,
}

/// Success body of `POST /api/detect`: the flat report plus derived alerts.
#[derive(Serialize)]
struct DetectResponse<'a> {
    #[serde(flatten)]
    report: &'a DetectionReport,
    alerts: Vec<Alert>,
    ticker: bool,
    billboard: Option<Billboard>,
}

impl<'a> DetectResponse<'a> {
    fn new(report: &'a DetectionReport) -> Self {
        Self {
            report,
            alerts: alerts_for(report),
            ticker: ticker_active(report),
            billboard: billboard_for(report),
        }
    }
}

fn run_api(listener: TcpListener, state: &mut ServerState, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, state) {
                    log::warn!("detection api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, state: &mut ServerState) -> Result<()> {
    stream.set_nonblocking(false)?;
    let peer = stream.peer_addr()?;
    let local = stream.local_addr()?;
    if local.ip().is_loopback() && !peer.ip().is_loopback() {
        write_json_response(&mut stream, 403, r#"{"error":"forbidden"}"#)?;
        return Ok(());
    }

    let mut request = read_request_head(&mut stream)?;
    let route = request.path.clone();
    let allowed_method = match route.as_str() {
        "/health" | "/api/detections" | "/api/detections/latest" => "GET",
        "/api/detect" => "POST",
        _ => {
            write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#)?;
            return Ok(());
        }
    };
    if request.method != allowed_method {
        write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#)?;
        return Ok(());
    }

    match route.as_str() {
        "/health" => write_json_response(&mut stream, 200, r#"{"status":"ok"}"#),
        "/api/detections" => {
            let entries: Vec<_> = state.history.entries().collect();
            let payload = serde_json::to_vec(&entries)?;
            write_response(&mut stream, 200, "application/json", &payload)
        }
        "/api/detections/latest" => match state.history.latest() {
            Some(entry) => {
                let payload = serde_json::to_vec(entry)?;
                write_response(&mut stream, 200, "application/json", &payload)
            }
            None => write_json_response(&mut stream, 404, r#"{"error":"no_detections"}"#),
        },
        _ => handle_detect(&mut stream, &mut request, state),
    }
}

fn handle_detect(
    stream: &mut TcpStream,
    request: &mut HttpRequest,
    state: &mut ServerState,
) -> Result<()> {
    if request.content_length()? > state.cfg.max_upload_bytes {
        write_json_response(stream, 413, r#"{"error":"payload_too_large"}"#)?;
        return Err(anyhow!("upload exceeds {} bytes", state.cfg.max_upload_bytes));
    }
    request.read_body(stream)?;

    let upload = match extract_upload(request) {
        Ok(upload) => upload,
        Err(err) => {
            write_json_response(stream, 400, r#"{"error":"malformed_upload"}"#)?;
            return Err(err);
        }
    };
    let Some(image) = upload.file.filter(|file| !file.is_empty()) else {
        write_json_response(stream, 400, r#"{"error":"No file provided"}"#)?;
        return Ok(());
    };

    let format = match image::guess_format(&image) {
        Ok(format) => format,
        Err(_) => {
            write_json_response(stream, 415, r#"{"error":"unsupported_media_type"}"#)?;
            return Err(anyhow!("upload is not a recognized image"));
        }
    };

    let speed_param = request
        .query_param("vehicleSpeed")
        .or(upload.vehicle_speed);
    let vehicle_speed = match speed_param {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(speed) => speed,
            Err(_) => {
                write_json_response(stream, 400, r#"{"error":"invalid_vehicle_speed"}"#)?;
                return Err(anyhow!("invalid vehicle speed '{}'", raw));
            }
        },
        None => state.cfg.vehicle_speed,
    };

    let digest = image_digest(&image);
    log::debug!(
        "detect request: {} bytes, format {:?}, sha256 {}",
        image.len(),
        format,
        digest
    );

    let output = match state.registry.detect(&image) {
        Ok(output) => output,
        Err(err) => {
            log::error!("detection failed for image {}: {:#}", digest, err);
            write_json_response(stream, 500, DETECTION_FAILED)?;
            return Ok(());
        }
    };
    let report =
        match DetectionReport::from_predictions(output.predictions.predictions(), vehicle_speed) {
            Ok(report) => report,
            Err(err) => {
                log::error!(
                    "backend '{}' returned malformed predictions: {}",
                    output.backend,
                    err
                );
                write_json_response(stream, 500, DETECTION_FAILED)?;
                return Ok(());
            }
        };

    log::info!(
        "image {} via {}: {} detections, risk {}",
        &digest[..12],
        output.backend,
        report.detections.len(),
        report.risk_level
    );

    let entry = state.history.record(&image, &output.backend, report);
    let payload = serde_json::to_vec(&DetectResponse::new(&entry.report))?;
    write_response(stream, 200, "application/json", &payload)
}

struct Upload {
    file: Option<Vec<u8>>,
    vehicle_speed: Option<String>,
}

fn extract_upload(request: &mut HttpRequest) -> Result<Upload> {
    let content_type = request.content_type().to_string();
    if let Some(boundary) = boundary_from_content_type(&content_type) {
        let parts = parse_multipart(&request.body, &boundary)?;
        let mut upload = Upload {
            file: None,
            vehicle_speed: None,
        };
        for part in parts {
            match part.name.as_str() {
                "file" => upload.file = Some(part.data),
                "vehicleSpeed" => {
                    upload.vehicle_speed = Some(String::from_utf8_lossy(&part.data).into_owned())
                }
                _ => {}
            }
        }
        return Ok(upload);
    }

    let media = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let raw_image = media.starts_with("image/") || media == "application/octet-stream";
    Ok(Upload {
        file: raw_image.then(|| std::mem::take(&mut request.body)),
        vehicle_speed: None,
    })
}
