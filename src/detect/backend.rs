use anyhow::Result;

use crate::detect::result::PredictionSet;

pub const FIXTURE_BACKEND: &str = "fixture";
pub const REMOTE_BACKEND: &str = "remote";
pub const SUBPROCESS_BACKEND: &str = "subprocess";

/// Every backend name the registry knows how to build.
pub const KNOWN_BACKENDS: &[&str] = &[FIXTURE_BACKEND, REMOTE_BACKEND, SUBPROCESS_BACKEND];

/// Detector backend trait: given image bytes, return raw predictions.
///
/// Backends own how predictions are obtained (hosted model, local script,
/// canned data). The normalizer and scorer never see anything but the
/// returned [`PredictionSet`].
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an encoded image (JPEG, PNG, ...).
    ///
    /// The byte slice is read-only and must not be retained past the call.
    fn detect(&mut self, image: &[u8]) -> Result<PredictionSet>;

    /// Optional warm-up hook, run once when the service starts.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
