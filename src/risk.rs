//! Table-driven road-crossing risk scoring.

use serde::{Deserialize, Serialize};

use crate::normalize::Detection;

const HIGH_TIER: &[&str] = &["Lion", "Tiger", "Bear", "Wolf", "Moose", "Elk"];
const MEDIUM_TIER: &[&str] = &["Deer", "Antelope", "Zebra", "Wild Boar", "Coyote"];

const HIGH_TIER_SCORE: u32 = 95;
const MEDIUM_TIER_SCORE: u32 = 70;

const CRITICAL_THRESHOLD: u32 = 90;
const WARNING_THRESHOLD: u32 = 70;
const CAUTION_THRESHOLD: u32 = 50;

const CROSSING_BASE: u32 = 10;
const CROSSING_CAP: u32 = 95;

/// Placeholder distances in meters. Not a measurement.
const DISTANCE_HIGH_TIER_M: u32 = 8;
const DISTANCE_DEFAULT_M: u32 = 25;

/// Coarse risk level, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Caution,
    Warning,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Caution => "caution",
            RiskLevel::Warning => "warning",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static species classification used only for aggregate risk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskTier {
    Medium,
    High,
}

/// Tier of a display name. Unmapped labels and "Vehicle" have none.
pub fn risk_tier(animal: &str) -> Option<RiskTier> {
    if HIGH_TIER.contains(&animal) {
        Some(RiskTier::High)
    } else if MEDIUM_TIER.contains(&animal) {
        Some(RiskTier::Medium)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// Integer percent, 0-100.
    pub crossing_probability: u32,
    /// Heuristic placeholder in meters.
    pub distance_to_road: u32,
}

/// Score a detection list. Never fails; result depends only on which
/// species are present, not on their order.
pub fn assess(detections: &[Detection]) -> RiskAssessment {
    // Tracked separately: the flag alone forces critical.
    let mut has_high_tier = false;
    let mut max_risk = 0u32;

    for det in detections {
        match risk_tier(&det.animal) {
            Some(RiskTier::High) => {
                has_high_tier = true;
                max_risk = max_risk.max(HIGH_TIER_SCORE);
            }
            Some(RiskTier::Medium) => {
                max_risk = max_risk.max(MEDIUM_TIER_SCORE);
            }
            None => {}
        }
    }

    // The caution branch is unreachable with the current tiers (max_risk is
    // one of 0, 70, 95); it stays for a future lower tier.
    let risk_level = if has_high_tier || max_risk >= CRITICAL_THRESHOLD {
        RiskLevel::Critical
    } else if max_risk >= WARNING_THRESHOLD {
        RiskLevel::Warning
    } else if max_risk >= CAUTION_THRESHOLD {
        RiskLevel::Caution
    } else {
        RiskLevel::Safe
    };

    RiskAssessment {
        risk_level,
        crossing_probability: (max_risk + CROSSING_BASE).min(CROSSING_CAP),
        distance_to_road: if has_high_tier {
            DISTANCE_HIGH_TIER_M
        } else {
            DISTANCE_DEFAULT_M
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::BoundingBox;

    fn det(id: usize, animal: &str) -> Detection {
        Detection {
            id,
            animal: animal.to_string(),
            confidence: 90.0,
            bbox: BoundingBox {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            },
        }
    }

    fn dets(names: &[&str]) -> Vec<Detection> {
        names.iter().enumerate().map(|(i, n)| det(i, n)).collect()
    }

    #[test]
    fn empty_list_is_safe_with_base_crossing() {
        let risk = assess(&[]);
        assert_eq!(
            risk,
            RiskAssessment {
                risk_level: RiskLevel::Safe,
                crossing_probability: 10,
                distance_to_road: 25,
            }
        );
    }

    #[test]
    fn single_high_tier_animal_is_critical() {
        let risk = assess(&dets(&["Lion"]));
        assert_eq!(risk.risk_level, RiskLevel::Critical);
        assert_eq!(risk.crossing_probability, 95);
        assert_eq!(risk.distance_to_road, 8);
    }

    #[test]
    fn single_medium_tier_animal_is_warning() {
        let risk = assess(&dets(&["Deer"]));
        assert_eq!(risk.risk_level, RiskLevel::Warning);
        assert_eq!(risk.crossing_probability, 80);
        assert_eq!(risk.distance_to_road, 25);
    }

    #[test]
    fn untiered_labels_contribute_nothing() {
        for names in [
            &["capybara"][..],
            &["Vehicle"][..],
            &["Fox", "Raccoon", "Giraffe"][..],
        ] {
            let risk = assess(&dets(names));
            assert_eq!(risk.risk_level, RiskLevel::Safe);
            assert_eq!(risk.crossing_probability, 10);
            assert_eq!(risk.distance_to_road, 25);
        }
    }

    #[test]
    fn tiers_match_on_display_names_only() {
        assert_eq!(risk_tier("Wild Boar"), Some(RiskTier::Medium));
        assert_eq!(risk_tier("wild_boar"), None);
        assert_eq!(risk_tier("lion"), None);
        assert_eq!(risk_tier("Elk"), Some(RiskTier::High));
    }

    #[test]
    fn high_tier_dominates_regardless_of_order() {
        let a = assess(&dets(&["Lion", "Deer", "Vehicle"]));
        let b = assess(&dets(&["Deer", "Vehicle", "Lion"]));
        let c = assess(&dets(&["Vehicle", "Lion", "Deer"]));
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn adding_a_riskier_species_never_lowers_the_level() {
        let base = ["Fox", "Deer", "Zebra", "Bear"];
        let mut seen = Vec::new();
        let mut last = RiskLevel::Safe;
        for name in base {
            seen.push(name);
            let level = assess(&dets(&seen)).risk_level;
            assert!(level >= last, "{level} dropped below {last}");
            last = level;
        }
        assert_eq!(last, RiskLevel::Critical);
    }

    #[test]
    fn risk_levels_are_ordered_and_serialize_lowercase() {
        assert!(RiskLevel::Safe < RiskLevel::Caution);
        assert!(RiskLevel::Caution < RiskLevel::Warning);
        assert!(RiskLevel::Warning < RiskLevel::Critical);
        assert_eq!(
            serde_json::to_string(&RiskLevel::Critical).unwrap(),
            "\"critical\""
        );
    }
}
