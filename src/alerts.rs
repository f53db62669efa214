//! Driver-facing alerts derived from a detection report.
//!
//! Everything here is a pure function of [`DetectionReport`]; the same report
//! always yields the same alert cards, ticker state and billboard text.

use serde::{Deserialize, Serialize};

use crate::report::DetectionReport;
use crate::risk::{risk_tier, RiskLevel};

const HIGH_CROSSING_PROBABILITY: u32 = 70;
const HIGH_VEHICLE_SPEED: u32 = 80;
const CLOSE_TO_ROAD_M: u32 = 50;
const TICKER_CROSSING_PROBABILITY: u32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CriticalRisk,
    HighCrossingProbability,
    HighVehicleSpeed,
    CloseToRoad,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub description: String,
}

/// Roadside billboard message for the most dangerous detected species.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Billboard {
    pub level: RiskLevel,
    pub headline: String,
    pub subtext: String,
}

/// Alert cards for a report, in display order.
pub fn alerts_for(report: &DetectionReport) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if report.risk_level == RiskLevel::Critical {
        alerts.push(Alert {
            kind: AlertKind::CriticalRisk,
            title: "Critical Risk Detected".to_string(),
            description: "High-speed approach with high crossing probability".to_string(),
        });
    }
    if report.crossing_probability > HIGH_CROSSING_PROBABILITY {
        alerts.push(Alert {
            kind: AlertKind::HighCrossingProbability,
            title: "High Crossing Probability".to_string(),
            description: format!(
                "{}% chance of road crossing",
                report.crossing_probability
            ),
        });
    }
    if report.vehicle_speed > HIGH_VEHICLE_SPEED {
        alerts.push(Alert {
            kind: AlertKind::HighVehicleSpeed,
            title: "High Vehicle Speed".to_string(),
            description: format!(
                "Traveling at {} km/h - reduce speed",
                report.vehicle_speed
            ),
        });
    }
    if report.distance_to_road < CLOSE_TO_ROAD_M {
        alerts.push(Alert {
            kind: AlertKind::CloseToRoad,
            title: "Close to Road".to_string(),
            description: format!("Animal is only {}m from road", report.distance_to_road),
        });
    }

    alerts
}

/// Whether the scrolling crossing ticker should be shown.
pub fn ticker_active(report: &DetectionReport) -> bool {
    report.risk_level == RiskLevel::Critical
        || report.crossing_probability > TICKER_CROSSING_PROBABILITY
}

/// Billboard text, or `None` when the report is safe.
pub fn billboard_for(report: &DetectionReport) -> Option<Billboard> {
    let headline = match report.risk_level {
        RiskLevel::Safe => return None,
        RiskLevel::Caution => "DRIVE WITH CARE",
        RiskLevel::Warning => "SLOW DOWN - WILDLIFE",
        RiskLevel::Critical => "STOP! ANIMAL CROSSING",
    };

    // max_by_key keeps the last maximum, so walk in reverse to favour the
    // earliest detection on ties.
    let species = report
        .detections
        .iter()
        .rev()
        .filter_map(|det| risk_tier(&det.animal).map(|tier| (tier, det)))
        .max_by_key(|(tier, _)| *tier)
        .map(|(_, det)| det.animal.as_str())
        .or_else(|| report.detections.first().map(|det| det.animal.as_str()))
        .unwrap_or("wildlife");

    Some(Billboard {
        level: report.risk_level,
        headline: headline.to_string(),
        subtext: format!("{} DETECTED", species.to_uppercase()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::RawPrediction;

    fn report(labels: &[&str], vehicle_speed: u32) -> DetectionReport {
        let preds: Vec<RawPrediction> = labels
            .iter()
            .map(|label| RawPrediction::new(label, 0.9, 50.0, 50.0, 20.0, 20.0))
            .collect();
        DetectionReport::from_predictions(Some(&preds), vehicle_speed).unwrap()
    }

    fn kinds(alerts: &[Alert]) -> Vec<AlertKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn critical_report_raises_all_risk_alerts() {
        let r = report(&["lion"], 65);
        assert_eq!(
            kinds(&alerts_for(&r)),
            vec![
                AlertKind::CriticalRisk,
                AlertKind::HighCrossingProbability,
                AlertKind::CloseToRoad
            ]
        );
        assert!(ticker_active(&r));
    }

    #[test]
    fn speed_alert_only_above_threshold() {
        assert!(!kinds(&alerts_for(&report(&[], 80))).contains(&AlertKind::HighVehicleSpeed));
        let alerts = alerts_for(&report(&[], 81));
        let speed = alerts
            .iter()
            .find(|a| a.kind == AlertKind::HighVehicleSpeed)
            .unwrap();
        assert_eq!(speed.description, "Traveling at 81 km/h - reduce speed");
    }

    #[test]
    fn safe_report_still_flags_placeholder_distance() {
        let r = report(&[], 65);
        assert_eq!(kinds(&alerts_for(&r)), vec![AlertKind::CloseToRoad]);
        assert!(!ticker_active(&r));
        assert!(billboard_for(&r).is_none());
    }

    #[test]
    fn warning_report_turns_on_ticker() {
        let r = report(&["deer"], 65);
        assert_eq!(r.crossing_probability, 80);
        assert!(ticker_active(&r));
        let alerts = alerts_for(&r);
        assert_eq!(alerts[0].description, "80% chance of road crossing");
    }

    #[test]
    fn billboard_names_highest_tier_species() {
        let r = report(&["deer", "vehicle", "bear", "wolf"], 65);
        let board = billboard_for(&r).unwrap();
        assert_eq!(board.level, RiskLevel::Critical);
        assert_eq!(board.headline, "STOP! ANIMAL CROSSING");
        assert_eq!(board.subtext, "BEAR DETECTED");

        let r = report(&["fox", "wild boar", "coyote"], 65);
        let board = billboard_for(&r).unwrap();
        assert_eq!(board.headline, "SLOW DOWN - WILDLIFE");
        assert_eq!(board.subtext, "WILD BOAR DETECTED");
    }
}
