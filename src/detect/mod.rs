//! Detector backends.
//!
//! Object detection is delegated entirely to a backend: a hosted inference
//! API, a local script, or canned fixture data. Every backend implements
//! [`DetectorBackend`] and returns raw predictions; the registry picks which
//! one serves a request.

mod backend;
mod backends;
mod registry;
mod result;

pub use backend::{
    DetectorBackend, FIXTURE_BACKEND, KNOWN_BACKENDS, REMOTE_BACKEND, SUBPROCESS_BACKEND,
};
pub use backends::{
    FixtureBackend, RemoteBackend, RemoteConfig, SubprocessBackend, SubprocessConfig,
};
pub use registry::{BackendOutput, BackendRegistry};
pub use result::{ImageInfo, PredictionSet, RawPrediction};
