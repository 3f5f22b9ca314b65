//! Read contract of an upstream remedial-action optimization.

use crate::cnec::{AngleCnec, PhysicalParameter, Unit};
use crate::state::{Instant, State};
use angmon_core::{AngmonError, AngmonResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComputationStatus {
    Default,
    PartialFailure,
    Failure,
}

pub trait OptimizationResult: Send + Sync {
    fn computation_status(&self) -> ComputationStatus;

    /// Ids of the network actions activated at exactly this state.
    fn activated_network_actions(&self, state: &State) -> BTreeSet<String>;

    /// Ids of the range actions activated at exactly this state.
    fn activated_range_actions(&self, state: &State) -> BTreeSet<String>;

    fn optimized_setpoint(&self, state: &State, range_action_id: &str) -> Option<f64>;

    fn angle(&self, instant: Instant, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64>;

    fn margin(&self, instant: Instant, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64>;

    fn is_secure(&self, parameters: &[PhysicalParameter]) -> bool;
}

/// Decisions of one state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDecisions {
    pub network_actions: BTreeSet<String>,
    /// Range action id -> set-point (degrees)
    pub range_setpoints: BTreeMap<String, f64>,
}

/// In-memory optimization result assembled from decided actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedOptimizationResult {
    pub status: ComputationStatus,
    decisions: BTreeMap<String, StateDecisions>,
    /// Instant -> cnec id -> angle (degrees)
    angles: BTreeMap<Instant, BTreeMap<String, f64>>,
    unsecure_parameters: BTreeSet<PhysicalParameter>,
}

impl Default for RecordedOptimizationResult {
    fn default() -> Self {
        Self {
            status: ComputationStatus::Default,
            decisions: BTreeMap::new(),
            angles: BTreeMap::new(),
            unsecure_parameters: BTreeSet::new(),
        }
    }
}

impl RecordedOptimizationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate_network_action(&mut self, state: &State, action_id: impl Into<String>) {
        self.decisions
            .entry(state.id())
            .or_default()
            .network_actions
            .insert(action_id.into());
    }

    pub fn activate_range_action(&mut self, state: &State, action_id: impl Into<String>, setpoint_deg: f64) {
        self.decisions
            .entry(state.id())
            .or_default()
            .range_setpoints
            .insert(action_id.into(), setpoint_deg);
    }

    pub fn record_angle(&mut self, instant: Instant, cnec_id: impl Into<String>, angle_deg: f64) {
        self.angles
            .entry(instant)
            .or_default()
            .insert(cnec_id.into(), angle_deg);
    }

    pub fn mark_unsecure(&mut self, parameter: PhysicalParameter) {
        self.unsecure_parameters.insert(parameter);
    }

    fn recorded_angle(&self, instant: Instant, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64> {
        if unit != Unit::Degree {
            return Err(AngmonError::UnhandledUnit {
                unit: unit.to_string(),
                subject: format!("AngleCnec {}", cnec.id),
            });
        }
        self.angles
            .get(&instant)
            .and_then(|by_cnec| by_cnec.get(&cnec.id))
            .copied()
            .ok_or_else(|| {
                AngmonError::MissingResult(format!(
                    "no angle recorded for AngleCnec {} at instant {}",
                    cnec.id, instant
                ))
            })
    }
}

impl OptimizationResult for RecordedOptimizationResult {
    fn computation_status(&self) -> ComputationStatus {
        self.status
    }

    fn activated_network_actions(&self, state: &State) -> BTreeSet<String> {
        self.decisions
            .get(&state.id())
            .map(|d| d.network_actions.clone())
            .unwrap_or_default()
    }

    fn activated_range_actions(&self, state: &State) -> BTreeSet<String> {
        self.decisions
            .get(&state.id())
            .map(|d| d.range_setpoints.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn optimized_setpoint(&self, state: &State, range_action_id: &str) -> Option<f64> {
        self.decisions
            .get(&state.id())?
            .range_setpoints
            .get(range_action_id)
            .copied()
    }

    fn angle(&self, instant: Instant, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64> {
        self.recorded_angle(instant, cnec, unit)
    }

    fn margin(&self, instant: Instant, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64> {
        Ok(cnec.margin(self.recorded_angle(instant, cnec, unit)?))
    }

    fn is_secure(&self, parameters: &[PhysicalParameter]) -> bool {
        parameters
            .iter()
            .all(|p| !self.unsecure_parameters.contains(p))
    }
}
