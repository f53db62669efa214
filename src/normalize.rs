//! Response normalizer.
//!
//! Turns a backend's raw predictions (free-text class, center+size box, 0-1
//! confidence) into canonical [`Detection`] records: display name, percentage
//! confidence, integer corner+size box and an index-based id.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::detect::RawPrediction;
use crate::error::DataShapeError;

/// Closed display vocabulary, keyed by normalized label.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("lion", "Lion"),
    ("deer", "Deer"),
    ("raccoon", "Raccoon"),
    ("bear", "Bear"),
    ("moose", "Moose"),
    ("elk", "Elk"),
    ("tiger", "Tiger"),
    ("zebra", "Zebra"),
    ("giraffe", "Giraffe"),
    ("wild_boar", "Wild Boar"),
    ("fox", "Fox"),
    ("coyote", "Coyote"),
    ("antelope", "Antelope"),
    ("wolf", "Wolf"),
];

/// Top-left corner box in pixels. Values may be negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BoundingBox {
    /// Convert a center+size box, rounding each value independently.
    pub fn from_center(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x: round_half_up(cx - width / 2.0),
            y: round_half_up(cy - height / 2.0),
            width: round_half_up(width),
            height: round_half_up(height),
        }
    }
}

/// Canonical detection record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Position in the response; unique per response only.
    pub id: usize,
    pub animal: String,
    /// Percentage 0-100 with one fractional digit.
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Normalize a label key: lowercase, whitespace runs become `_`.
pub fn normalize_key(label: &str) -> String {
    static WHITESPACE_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = WHITESPACE_RE.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re.replace_all(&label.to_lowercase(), "_").into_owned()
}

/// Map a raw class label to its display name, or pass it through verbatim.
pub fn display_name(label: &str) -> String {
    let key = normalize_key(label);
    DISPLAY_NAMES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| label.to_string())
}

/// Confidence in 0..1 to a percentage rounded to one decimal.
///
/// The percentage is rounded once, on its exact binary value. Exact ties
/// (only `.25`/`.75` are representable) go toward +inf.
pub fn confidence_percent(confidence: f64) -> f64 {
    let percent = confidence * 100.0;
    if (percent * 4.0).fract() == 0.0 && (percent * 2.0).fract() != 0.0 {
        return (percent * 10.0 + 0.5).floor() / 10.0;
    }
    format!("{:.1}", percent).parse().unwrap_or(percent)
}

/// Normalize a backend's prediction list.
///
/// Absent and empty inputs both yield an empty list. Output order and length
/// match the input; element `i` gets id `i`.
pub fn normalize_predictions(
    predictions: Option<&[RawPrediction]>,
) -> Result<Vec<Detection>, DataShapeError> {
    let Some(predictions) = predictions else {
        return Ok(Vec::new());
    };
    predictions
        .iter()
        .enumerate()
        .map(|(index, pred)| normalize_one(index, pred))
        .collect()
}

fn normalize_one(index: usize, pred: &RawPrediction) -> Result<Detection, DataShapeError> {
    let class = pred
        .class
        .as_deref()
        .ok_or(DataShapeError::new(index, "class"))?;
    let confidence = required(index, "confidence", pred.confidence)?;
    let cx = required(index, "x", pred.x)?;
    let cy = required(index, "y", pred.y)?;
    let width = required(index, "width", pred.width)?;
    let height = required(index, "height", pred.height)?;

    Ok(Detection {
        id: index,
        animal: display_name(class),
        confidence: confidence_percent(confidence),
        bbox: BoundingBox::from_center(cx, cy, width, height),
    })
}

fn required(index: usize, field: &'static str, value: Option<f64>) -> Result<f64, DataShapeError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(DataShapeError::new(index, field)),
    }
}

// Half-way values go toward +inf, so -2.5 becomes -2.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}
