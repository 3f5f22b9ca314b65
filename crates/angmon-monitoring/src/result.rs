//! Per-scenario results and their aggregation.

use crate::redispatch::RedispatchOutcome;
use angmon_core::{AngmonError, AngmonResult};
use angmon_crac::{AngleCnec, State, Unit};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

/// Security verdict. Variants are declared in aggregation precedence, so the
/// global status is the maximum of the scenario statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonitoringStatus {
    Secure,
    Unknown,
    Unsecure,
    Divergent,
}

impl fmt::Display for MonitoringStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MonitoringStatus::Secure => "SECURE",
            MonitoringStatus::Unknown => "UNKNOWN",
            MonitoringStatus::Unsecure => "UNSECURE",
            MonitoringStatus::Divergent => "DIVERGENT",
        })
    }
}

/// Fold scenario statuses; no scenario at all is `Unknown`, never `Secure`.
pub fn aggregate_status<I>(statuses: I) -> MonitoringStatus
where
    I: IntoIterator<Item = MonitoringStatus>,
{
    statuses
        .into_iter()
        .max()
        .unwrap_or(MonitoringStatus::Unknown)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleResult {
    pub cnec: AngleCnec,
    /// Degrees; NaN when the scenario could not be computed
    pub angle_deg: f64,
}

impl AngleResult {
    pub fn is_violated(&self) -> bool {
        self.cnec.threshold_overshoot(self.angle_deg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub state: State,
    pub angles: Vec<AngleResult>,
    pub applied_actions: BTreeSet<String>,
    pub status: MonitoringStatus,
    pub redispatch: Vec<RedispatchOutcome>,
}

impl ScenarioResult {
    pub fn new(state: State, angles: Vec<AngleResult>, status: MonitoringStatus) -> Self {
        Self {
            state,
            angles,
            applied_actions: BTreeSet::new(),
            status,
            redispatch: Vec::new(),
        }
    }

    fn with_nan_angles<'a>(
        state: &State,
        cnecs: impl IntoIterator<Item = &'a AngleCnec>,
        status: MonitoringStatus,
    ) -> Self {
        let angles = cnecs
            .into_iter()
            .map(|cnec| AngleResult {
                cnec: cnec.clone(),
                angle_deg: f64::NAN,
            })
            .collect();
        Self::new(state.clone(), angles, status)
    }

    pub fn divergent<'a>(state: &State, cnecs: impl IntoIterator<Item = &'a AngleCnec>) -> Self {
        Self::with_nan_angles(state, cnecs, MonitoringStatus::Divergent)
    }

    pub fn unknown<'a>(state: &State, cnecs: impl IntoIterator<Item = &'a AngleCnec>) -> Self {
        Self::with_nan_angles(state, cnecs, MonitoringStatus::Unknown)
    }
}

/// Merged outcome of a monitoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleMonitoringResult {
    scenarios: Vec<ScenarioResult>,
    status: MonitoringStatus,
}

impl AngleMonitoringResult {
    pub fn aggregate(scenarios: Vec<ScenarioResult>) -> Self {
        let status = aggregate_status(scenarios.iter().map(|s| s.status));
        Self { scenarios, status }
    }

    /// Result of a run without any angle constraint.
    pub fn secure_without_constraints() -> Self {
        Self::aggregate(vec![ScenarioResult::new(
            State::preventive(),
            Vec::new(),
            MonitoringStatus::Secure,
        )])
    }

    pub fn status(&self) -> MonitoringStatus {
        self.status
    }

    pub fn is_secure(&self) -> bool {
        self.status == MonitoringStatus::Secure
    }

    pub fn is_unsecure(&self) -> bool {
        self.status == MonitoringStatus::Unsecure
    }

    pub fn is_divergent(&self) -> bool {
        self.status == MonitoringStatus::Divergent
    }

    pub fn is_unknown(&self) -> bool {
        self.status == MonitoringStatus::Unknown
    }

    pub fn scenarios(&self) -> &[ScenarioResult] {
        &self.scenarios
    }

    pub fn scenario(&self, state: &State) -> Option<&ScenarioResult> {
        self.scenarios.iter().find(|s| &s.state == state)
    }

    pub fn angle_results(&self) -> impl Iterator<Item = &AngleResult> {
        self.scenarios.iter().flat_map(|s| s.angles.iter())
    }

    pub fn angle(&self, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64> {
        if unit != Unit::Degree {
            return Err(AngmonError::UnhandledUnit {
                unit: unit.to_string(),
                subject: format!("AngleCnec {}", cnec.id),
            });
        }
        self.angle_results()
            .find(|r| r.cnec.id == cnec.id && r.cnec.state == cnec.state)
            .map(|r| r.angle_deg)
            .ok_or_else(|| {
                AngmonError::MissingResult(format!(
                    "AngleMonitoringResult was not defined with AngleCnec {} and state {}",
                    cnec.id,
                    cnec.state.id()
                ))
            })
    }

    pub fn margin(&self, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64> {
        Ok(cnec.margin(self.angle(cnec, unit)?))
    }

    /// Remedial actions this run applied at `state`.
    pub fn applied_actions(&self, state: &State) -> BTreeSet<String> {
        self.scenarios
            .iter()
            .filter(|s| &s.state == state)
            .flat_map(|s| s.applied_actions.iter().cloned())
            .collect()
    }

    pub fn applied_actions_by_state_id(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut by_state: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for scenario in &self.scenarios {
            by_state
                .entry(scenario.state.id())
                .or_default()
                .extend(scenario.applied_actions.iter().cloned());
        }
        by_state
    }

    /// Human-readable summary, one message per line.
    pub fn constraint_report(&self) -> Vec<String> {
        match self.status {
            MonitoringStatus::Divergent => vec!["Load flow divergence.".to_string()],
            MonitoringStatus::Secure => vec!["All AngleCnecs are secure.".to_string()],
            MonitoringStatus::Unknown => vec!["Unknown status on AngleCnecs.".to_string()],
            MonitoringStatus::Unsecure => {
                let mut lines = vec!["Some AngleCnecs are not secure:".to_string()];
                lines.extend(self.angle_results().filter(|r| r.is_violated()).map(|r| {
                    format!(
                        "AngleCnec {} (with importing network element {} and exporting network element {}) at state {} has an angle of {:.0}°.",
                        r.cnec.id,
                        r.cnec.importing_element,
                        r.cnec.exporting_element,
                        r.cnec.state.id(),
                        r.angle_deg
                    )
                }));
                lines
            }
        }
    }

    /// Log the constraint report at info level.
    pub fn print_constraints(&self) {
        for line in self.constraint_report() {
            info!("{}", line);
        }
    }
}
