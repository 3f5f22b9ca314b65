//! Monitoring of a single state.
//!
//! One evaluation runs: load flow, angle computation, selection and
//! application of remedial actions for violated constraints, redispatch of
//! the net power they moved, second load flow, angle re-computation. The
//! second pass only happens when at least one remedial action was applied.

use crate::cancel::CancellationFlag;
use crate::params::MonitoringParameters;
use crate::redispatch::{RedispatchOutcome, RedispatchStrategy};
use crate::result::{AngleResult, MonitoringStatus, ScenarioResult};
use crate::validator::{validate_elementary_action, Validation};
use angmon_core::{AngmonError, AngmonResult, Country, LoadFlowSolver, Megawatts, Network};
use angmon_crac::{AngleCnec, Crac, State};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Remedial actions applied so far in one state, with what they moved.
#[derive(Debug, Default)]
struct Application {
    /// Net power to redispatch per country
    deltas: BTreeMap<Country, Megawatts>,
    /// Elements set by remedial actions, off limits to redispatch
    exclusions: BTreeSet<String>,
    applied: BTreeSet<String>,
}

pub struct ScenarioEvaluator<'a> {
    crac: &'a Crac,
    load_flow: &'a dyn LoadFlowSolver,
    redispatch: &'a dyn RedispatchStrategy,
    parameters: &'a MonitoringParameters,
    cancellation: &'a CancellationFlag,
}

/// Angle of a constraint: highest angle at the exporting voltage level minus
/// lowest angle at the importing one, in degrees.
pub fn compute_angle(network: &Network, cnec: &AngleCnec) -> AngmonResult<f64> {
    let resolve = |element: &str| {
        network
            .resolve_voltage_level(element)
            .map(|vl| vl.id.clone())
            .ok_or_else(|| {
                AngmonError::Network(format!(
                    "AngleCnec {} references unknown element {}",
                    cnec.id, element
                ))
            })
    };
    let exporting = resolve(&cnec.exporting_element)?;
    let importing = resolve(&cnec.importing_element)?;

    let max_exporting = network
        .voltage_level_angles(&exporting)
        .into_iter()
        .map(|a| a.value())
        .fold(f64::NEG_INFINITY, f64::max);
    let min_importing = network
        .voltage_level_angles(&importing)
        .into_iter()
        .map(|a| a.value())
        .fold(f64::INFINITY, f64::min);
    if !max_exporting.is_finite() || !min_importing.is_finite() {
        return Err(AngmonError::Network(format!(
            "AngleCnec {}: no energized bus in voltage level {} or {}",
            cnec.id, exporting, importing
        )));
    }
    Ok(max_exporting - min_importing)
}

impl<'a> ScenarioEvaluator<'a> {
    pub fn new(
        crac: &'a Crac,
        load_flow: &'a dyn LoadFlowSolver,
        redispatch: &'a dyn RedispatchStrategy,
        parameters: &'a MonitoringParameters,
        cancellation: &'a CancellationFlag,
    ) -> Self {
        Self {
            crac,
            load_flow,
            redispatch,
            parameters,
            cancellation,
        }
    }

    fn run_load_flow(&self, state: &State, network: &mut Network) -> AngmonResult<bool> {
        self.cancellation.check(&state.id())?;
        let outcome = self.load_flow.solve(network, &self.parameters.load_flow);
        debug!(
            solver = self.load_flow.name(),
            converged = outcome.fully_converged,
            message = outcome.message.as_deref().unwrap_or(""),
            "load flow"
        );
        Ok(outcome.fully_converged)
    }

    fn compute_angles(&self, network: &Network, cnecs: &[&AngleCnec]) -> AngmonResult<Vec<AngleResult>> {
        cnecs
            .iter()
            .map(|cnec| {
                Ok(AngleResult {
                    cnec: (*cnec).clone(),
                    angle_deg: compute_angle(network, cnec)?,
                })
            })
            .collect()
    }

    /// Evaluate `state` on a network already carrying its contingency and
    /// previously decided remedial actions.
    pub fn evaluate(&self, state: &State, network: &mut Network) -> AngmonResult<ScenarioResult> {
        let cnecs: Vec<&AngleCnec> = self.crac.angle_cnecs_for(state).collect();

        if !self.run_load_flow(state, network)? {
            warn!("Load-flow computation failed at state {}. Skipping this state.", state);
            return Ok(ScenarioResult::divergent(state, cnecs));
        }
        let angles = self.compute_angles(network, &cnecs)?;

        let violated: Vec<&AngleCnec> = cnecs
            .iter()
            .zip(&angles)
            .filter(|(_, result)| result.is_violated())
            .map(|(cnec, _)| *cnec)
            .collect();
        if violated.is_empty() {
            return Ok(ScenarioResult::new(state.clone(), angles, MonitoringStatus::Secure));
        }
        if state.is_preventive() {
            for cnec in &violated {
                warn!(
                    "AngleCnec {} is constrained in preventive state, it cannot be secured.",
                    cnec.id
                );
            }
            return Ok(ScenarioResult::new(state.clone(), angles, MonitoringStatus::Unsecure));
        }

        let covered = self.redispatch.covered_countries();
        let mut application = Application::default();
        for cnec in &violated {
            self.apply_remedial_actions(cnec, network, &covered, &mut application)?;
        }
        if application.applied.is_empty() {
            return Ok(ScenarioResult::new(state.clone(), angles, MonitoringStatus::Unsecure));
        }

        let redispatch = self.redispatch_deltas(network, &application)?;

        if !self.run_load_flow(state, network)? {
            warn!(
                "Load-flow computation failed at state {} after applying RAs. Skipping this state.",
                state
            );
            return Ok(ScenarioResult::divergent(state, cnecs));
        }
        let angles = self.compute_angles(network, &cnecs)?;
        let status = if angles.iter().any(AngleResult::is_violated) {
            MonitoringStatus::Unsecure
        } else {
            MonitoringStatus::Secure
        };
        Ok(ScenarioResult {
            state: state.clone(),
            angles,
            applied_actions: application.applied,
            status,
            redispatch,
        })
    }

    /// Apply every eligible remedial action referencing `cnec`. An action is
    /// applied only if all of its elementary actions validate.
    fn apply_remedial_actions(
        &self,
        cnec: &AngleCnec,
        network: &mut Network,
        covered: &BTreeSet<Country>,
        application: &mut Application,
    ) -> AngmonResult<()> {
        let candidates = self.crac.remedial_actions_on_constraint(cnec);
        if candidates.is_empty() {
            warn!(
                "AngleCnec {} in state {} has no associated RA. Angle constraint cannot be secured.",
                cnec.id, cnec.state
            );
            return Ok(());
        }

        for remedial_action in candidates {
            if application.applied.contains(remedial_action.id()) {
                continue;
            }
            let Some(action) = remedial_action.as_network_action() else {
                warn!(
                    "Remedial action {} of AngleCnec {} is ignored : it is not a network action.",
                    remedial_action.id(),
                    cnec.id
                );
                continue;
            };

            let mut deltas = application.deltas.clone();
            let mut elements = BTreeSet::new();
            let mut rejection = None;
            for elementary in &action.elementary_actions {
                match validate_elementary_action(elementary, network, covered)? {
                    Validation::Accepted(injection) => {
                        *deltas.entry(injection.country).or_default() += injection.power_delta;
                        elements.insert(injection.element_id);
                    }
                    Validation::Rejected(reason) => {
                        rejection = Some(reason);
                        break;
                    }
                }
            }
            if let Some(reason) = rejection {
                warn!(
                    "Remedial action {} of AngleCnec {} is ignored : {}.",
                    action.id, cnec.id, reason
                );
                continue;
            }

            action.apply(network)?;
            info!("Remedial action {} applied for AngleCnec {}", action.id, cnec.id);
            application.deltas = deltas;
            application.exclusions.extend(elements);
            application.applied.insert(action.id.clone());
        }
        Ok(())
    }

    fn redispatch_deltas(
        &self,
        network: &mut Network,
        application: &Application,
    ) -> AngmonResult<Vec<RedispatchOutcome>> {
        let tolerance = self.parameters.redispatch.tolerance_mw;
        let mut outcomes = Vec::with_capacity(application.deltas.len());
        for (country, delta) in &application.deltas {
            info!("Redispatching {} MW in {} [start]", delta.value(), country);
            let outcome =
                self.redispatch
                    .redispatch(network, country, *delta, &application.exclusions)?;
            if outcome.shortfall().value() > tolerance {
                warn!(
                    "Redispatch in {} under-delivered: {} MW requested, {} MW realized",
                    country,
                    delta.value(),
                    outcome.realized.value()
                );
            }
            info!("Redispatching {} MW in {} [end]", delta.value(), country);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
