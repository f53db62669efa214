//! WildGuard
//!
//! This crate relays an uploaded image to a wildlife-detection backend and
//! turns the backend's raw predictions into display-ready detections plus a
//! coarse road-crossing risk assessment.
//!
//! # Pipeline
//!
//! 1. **Backend**: a [`DetectorBackend`] (hosted API, local script, fixture)
//!    returns raw center-box predictions. Detection itself is never done here.
//! 2. **Normalizer**: raw predictions become [`Detection`]s with display names,
//!    percentage confidence and corner boxes.
//! 3. **Scorer**: the detection list becomes a [`RiskAssessment`].
//! 4. **Report**: detections + assessment + vehicle speed form the flat JSON
//!    [`DetectionReport`] returned to callers.
//!
//! # Module Structure
//!
//! - `detect`: backend trait, registry, backends
//! - `normalize`, `risk`, `report`, `alerts`: pure core
//! - `history`: in-memory session history
//! - `api`: loopback HTTP service
//! - `config`: file + environment configuration

pub mod alerts;
pub mod api;
pub mod config;
pub mod detect;
pub mod error;
pub mod history;
pub mod normalize;
pub mod report;
pub mod risk;

pub use alerts::{alerts_for, billboard_for, ticker_active, Alert, AlertKind, Billboard};
pub use detect::{
    BackendOutput, BackendRegistry, DetectorBackend, FixtureBackend, PredictionSet,
    RawPrediction, RemoteBackend, RemoteConfig, SubprocessBackend, SubprocessConfig,
};
pub use error::DataShapeError;
pub use history::{DetectionHistory, HistoryEntry};
pub use normalize::{normalize_predictions, BoundingBox, Detection};
pub use report::{DetectionReport, DEFAULT_VEHICLE_SPEED};
pub use risk::{assess, RiskAssessment, RiskLevel, RiskTier};
