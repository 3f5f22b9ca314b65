//! Angle constraints and their degree thresholds.

use crate::state::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Measurement unit of a constraint query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Degree,
    Megawatt,
    Kilovolt,
    Ampere,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Unit::Degree => "°",
            Unit::Megawatt => "MW",
            Unit::Kilovolt => "kV",
            Unit::Ampere => "A",
        })
    }
}

/// Physical quantity monitored by a family of constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhysicalParameter {
    Flow,
    Angle,
    Voltage,
}

/// Bounds in degrees. A missing side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleThreshold {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AngleThreshold {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleCnec {
    pub id: String,
    pub state: State,
    /// Bus or voltage-level id where the minimum angle is taken.
    pub importing_element: String,
    /// Bus or voltage-level id where the maximum angle is taken.
    pub exporting_element: String,
    pub thresholds: Vec<AngleThreshold>,
}

impl AngleCnec {
    pub fn new(
        id: impl Into<String>,
        state: State,
        importing_element: impl Into<String>,
        exporting_element: impl Into<String>,
        thresholds: Vec<AngleThreshold>,
    ) -> Self {
        Self {
            id: id.into(),
            state,
            importing_element: importing_element.into(),
            exporting_element: exporting_element.into(),
            thresholds,
        }
    }

    /// True if the angle exceeds any upper bound or falls below any lower bound.
    /// A NaN angle never overshoots.
    pub fn threshold_overshoot(&self, angle_deg: f64) -> bool {
        self.thresholds.iter().any(|t| {
            t.max.is_some_and(|max| angle_deg > max) || t.min.is_some_and(|min| angle_deg < min)
        })
    }

    /// Smallest distance to any bound, negative when violated.
    pub fn margin(&self, angle_deg: f64) -> f64 {
        self.thresholds
            .iter()
            .flat_map(|t| {
                let upper = t.max.map(|max| max - angle_deg);
                let lower = t.min.map(|min| angle_deg - min);
                upper.into_iter().chain(lower)
            })
            .fold(f64::INFINITY, |acc, m| {
                if acc.is_nan() || m.is_nan() {
                    f64::NAN
                } else {
                    acc.min(m)
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Instant;

    fn cnec(thresholds: Vec<AngleThreshold>) -> AngleCnec {
        AngleCnec::new(
            "ac",
            State::post_contingency("co", Instant::Curative),
            "VL_IMP",
            "VL_EXP",
            thresholds,
        )
    }

    #[test]
    fn overshoot_checks_both_sides() {
        let c = cnec(vec![AngleThreshold::between(-60.0, 60.0)]);
        assert!(c.threshold_overshoot(95.0));
        assert!(c.threshold_overshoot(-61.0));
        assert!(!c.threshold_overshoot(60.0));
        assert!(!c.threshold_overshoot(f64::NAN));
    }

    #[test]
    fn overshoot_any_of_several_thresholds() {
        let c = cnec(vec![AngleThreshold::at_most(40.0), AngleThreshold::at_least(-10.0)]);
        assert!(c.threshold_overshoot(45.0));
        assert!(c.threshold_overshoot(-15.0));
        assert!(!c.threshold_overshoot(0.0));
    }

    #[test]
    fn margin_is_distance_to_closest_bound() {
        let c = cnec(vec![AngleThreshold::between(-60.0, 60.0)]);
        assert!((c.margin(50.0) - 10.0).abs() < 1e-12);
        assert!((c.margin(95.0) + 35.0).abs() < 1e-12);
        assert!(c.margin(f64::NAN).is_nan());
        assert_eq!(cnec(vec![]).margin(10.0), f64::INFINITY);
    }
}
