use serde::{Deserialize, Serialize};

use crate::detect::RawPrediction;
use crate::error::DataShapeError;
use crate::normalize::{normalize_predictions, Detection};
use crate::risk::{assess, RiskAssessment, RiskLevel};

/// Vehicle speed reported when the caller has nothing better, in km/h.
pub const DEFAULT_VEHICLE_SPEED: u32 = 65;

/// Flat detection report returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub detections: Vec<Detection>,
    /// Supplied by the caller context; not computed.
    pub vehicle_speed: u32,
    pub risk_level: RiskLevel,
    pub crossing_probability: u32,
    pub distance_to_road: u32,
}

impl DetectionReport {
    /// Normalize raw predictions, score them, and stamp the vehicle speed.
    pub fn from_predictions(
        predictions: Option<&[RawPrediction]>,
        vehicle_speed: u32,
    ) -> Result<Self, DataShapeError> {
        let detections = normalize_predictions(predictions)?;
        Ok(Self::from_detections(detections, vehicle_speed))
    }

    pub fn from_detections(detections: Vec<Detection>, vehicle_speed: u32) -> Self {
        let RiskAssessment {
            risk_level,
            crossing_probability,
            distance_to_road,
        } = assess(&detections);
        Self {
            detections,
            vehicle_speed,
            risk_level,
            crossing_probability,
            distance_to_road,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_predictions_produce_safe_report() {
        let report = DetectionReport::from_predictions(None, DEFAULT_VEHICLE_SPEED).unwrap();
        assert!(report.detections.is_empty());
        assert_eq!(report.vehicle_speed, 65);
        assert_eq!(report.risk_level, RiskLevel::Safe);
        assert_eq!(report.crossing_probability, 10);
        assert_eq!(report.distance_to_road, 25);
    }

    #[test]
    fn report_serializes_flat_camel_case() {
        let preds = vec![RawPrediction::new("deer", 0.877, 120.0, 80.0, 60.0, 40.0)];
        let report = DetectionReport::from_predictions(Some(&preds), 72).unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["vehicleSpeed"], 72);
        assert_eq!(value["riskLevel"], "warning");
        assert_eq!(value["crossingProbability"], 80);
        assert_eq!(value["distanceToRoad"], 25);
        let det = &value["detections"][0];
        assert_eq!(det["id"], 0);
        assert_eq!(det["animal"], "Deer");
        assert_eq!(det["confidence"], 87.7);
        assert_eq!(det["bbox"]["x"], 90);
        assert_eq!(det["bbox"]["y"], 60);
        assert_eq!(det["bbox"]["width"], 60);
        assert_eq!(det["bbox"]["height"], 40);
    }

    #[test]
    fn unmapped_label_passes_through_and_stays_safe() {
        let preds = vec![RawPrediction::new("capybara", 0.7, 50.0, 50.0, 10.0, 10.0)];
        let report = DetectionReport::from_predictions(Some(&preds), 65).unwrap();
        assert_eq!(report.detections[0].animal, "capybara");
        assert_eq!(report.risk_level, RiskLevel::Safe);
    }

    #[test]
    fn malformed_prediction_propagates() {
        let mut pred = RawPrediction::new("lion", 0.7, 50.0, 50.0, 10.0, 10.0);
        pred.x = None;
        let err = DetectionReport::from_predictions(Some(&[pred]), 65).unwrap_err();
        assert_eq!(err.field, "x");
    }
}
