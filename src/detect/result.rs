use serde::{Deserialize, Serialize};

/// One unprocessed prediction as returned by a detector backend.
///
/// Boxes are in center-point format (pixels). Every field is optional on the
/// wire; the normalizer decides which ones are required.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    /// Free-text class label ("deer", "Wild Boar", ...).
    #[serde(default)]
    pub class: Option<String>,
    /// Confidence in 0.0..=1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Box center x.
    #[serde(default)]
    pub x: Option<f64>,
    /// Box center y.
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

impl RawPrediction {
    pub fn new(class: &str, confidence: f64, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            class: Some(class.to_string()),
            confidence: Some(confidence),
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
        }
    }
}

/// Image metadata some backends echo back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

/// Full backend response. `predictions` may be absent entirely.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    #[serde(default)]
    pub predictions: Option<Vec<RawPrediction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageInfo>,
}

impl PredictionSet {
    pub fn from_predictions(predictions: Vec<RawPrediction>) -> Self {
        Self {
            predictions: Some(predictions),
            image: None,
        }
    }

    pub fn predictions(&self) -> Option<&[RawPrediction]> {
        self.predictions.as_deref()
    }

    /// Parse a backend JSON payload.
    pub fn from_json(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}
