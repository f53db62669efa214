use anyhow::Result;

use crate::detect::backend::{DetectorBackend, FIXTURE_BACKEND};
use crate::detect::result::{PredictionSet, RawPrediction};

/// Canned backend. Ignores the image and returns the same predictions on
/// every call; used offline and as a fallback.
pub struct FixtureBackend {
    predictions: Vec<RawPrediction>,
}

impl FixtureBackend {
    /// Default scene: a lion at 92.8% and a vehicle at 88.5%.
    pub fn new() -> Self {
        Self::with_predictions(vec![
            RawPrediction::new("lion", 0.928, 275.0, 240.0, 250.0, 280.0),
            RawPrediction::new("Vehicle", 0.885, 110.0, 60.0, 180.0, 100.0),
        ])
    }

    pub fn with_predictions(predictions: Vec<RawPrediction>) -> Self {
        Self { predictions }
    }
}

impl Default for FixtureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for FixtureBackend {
    fn name(&self) -> &'static str {
        FIXTURE_BACKEND
    }

    fn detect(&mut self, _image: &[u8]) -> Result<PredictionSet> {
        Ok(PredictionSet::from_predictions(self.predictions.clone()))
    }
}
