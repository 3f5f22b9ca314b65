//! Runs the preventive state, then every post-contingency state in parallel.

use crate::cancel::CancellationFlag;
use crate::evaluator::ScenarioEvaluator;
use crate::params::MonitoringParameters;
use crate::pool::NetworkPool;
use crate::redispatch::RedispatchStrategy;
use crate::result::{AngleMonitoringResult, ScenarioResult};
use angmon_core::{AngmonError, AngmonResult, LoadFlowSolver, Network};
use angmon_crac::{Crac, OptimizationResult, State};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, info_span, warn};

/// Angle monitoring of a whole catalog on one network.
pub struct AngleMonitoring<'a> {
    crac: &'a Crac,
    load_flow: &'a dyn LoadFlowSolver,
    redispatch: &'a dyn RedispatchStrategy,
    optimization: &'a dyn OptimizationResult,
    parameters: MonitoringParameters,
    cancellation: CancellationFlag,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

impl<'a> AngleMonitoring<'a> {
    pub fn new(
        crac: &'a Crac,
        load_flow: &'a dyn LoadFlowSolver,
        redispatch: &'a dyn RedispatchStrategy,
        optimization: &'a dyn OptimizationResult,
        parameters: MonitoringParameters,
    ) -> Self {
        Self {
            crac,
            load_flow,
            redispatch,
            optimization,
            parameters,
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationFlag) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn cancellation(&self) -> &CancellationFlag {
        &self.cancellation
    }

    fn evaluator(&self) -> ScenarioEvaluator<'_> {
        ScenarioEvaluator::new(
            self.crac,
            self.load_flow,
            self.redispatch,
            &self.parameters,
            &self.cancellation,
        )
    }

    /// Monitor every state holding angle constraints.
    ///
    /// The preventive state is evaluated on `network` itself. Post-contingency
    /// states each get a clone of `network` as it was before the preventive
    /// evaluation. Per-state failures become `Unknown` results; only invalid
    /// parameters or a pool setup failure abort the run.
    pub fn run(&self, network: &mut Network) -> AngmonResult<AngleMonitoringResult> {
        self.parameters.validate()?;
        info!("----- Angle monitoring [start]");

        if self.crac.angle_cnecs().next().is_none() {
            info!("No AngleCnecs defined.");
            info!("----- Angle monitoring [end]");
            return Ok(AngleMonitoringResult::secure_without_constraints());
        }

        let snapshot = network.clone();
        let mut results = Vec::new();

        if let Some(preventive) = self.crac.preventive_state() {
            results.push(self.run_preventive(network, &preventive));
        }

        let states: Vec<State> = self
            .crac
            .contingency_states_with_angle_cnecs()
            .into_iter()
            .collect();
        if !states.is_empty() {
            results.extend(self.run_contingency_states(&snapshot, &states)?);
        }

        let result = AngleMonitoringResult::aggregate(results);
        result.print_constraints();
        info!("----- Angle monitoring [end]");
        Ok(result)
    }

    fn run_preventive(&self, network: &mut Network, state: &State) -> ScenarioResult {
        let _span = info_span!("state", id = %state.id()).entered();
        let outcome = self
            .apply_decided_actions(network, state)
            .and_then(|()| self.evaluator().evaluate(state, network));
        self.unknown_on_error(state, outcome)
    }

    fn run_contingency_states(
        &self,
        snapshot: &Network,
        states: &[State],
    ) -> AngmonResult<Vec<ScenarioResult>> {
        let workers = self.parameters.effective_parallelism().min(states.len());
        let pool = NetworkPool::new(snapshot, workers)?;
        let threads = ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| AngmonError::Other(format!("building thread pool for angle monitoring: {e}")))?;
        info!(states = states.len(), workers, "monitoring post-contingency states");

        // One task per pooled clone, each pulling states until none are left.
        // A task holds its clone for its whole life, so acquiring never waits,
        // even when rayon work nested in a solver steals a sibling task.
        let next = AtomicUsize::new(0);
        let mut slots: Vec<(usize, ScenarioResult)> = threads.install(|| {
            (0..workers)
                .into_par_iter()
                .flat_map_iter(|_| {
                    let mut network = pool.acquire();
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(state) = states.get(index) else {
                            break;
                        };
                        network.reset();
                        done.push((index, self.run_contingency_state(&mut network, state)));
                    }
                    done
                })
                .collect()
        });
        slots.sort_by_key(|(index, _)| *index);
        Ok(slots.into_iter().map(|(_, result)| result).collect())
    }

    fn run_contingency_state(&self, network: &mut Network, state: &State) -> ScenarioResult {
        let _span = info_span!("state", id = %state.id()).entered();
        if self.cancellation.is_cancelled() {
            return self.unknown_on_error(
                state,
                Err(AngmonError::Cancelled(state.id())),
            );
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.monitor_contingency_state(network, state)
        }))
        .unwrap_or_else(|payload| {
            Err(AngmonError::Other(format!(
                "panic: {}",
                panic_message(payload.as_ref())
            )))
        });
        self.unknown_on_error(state, outcome)
    }

    fn monitor_contingency_state(&self, network: &mut Network, state: &State) -> AngmonResult<ScenarioResult> {
        let contingency_id = state.contingency.as_deref().ok_or_else(|| {
            AngmonError::Validation(format!("state {state} has no contingency"))
        })?;
        let contingency = self.crac.contingency(contingency_id).ok_or_else(|| {
            AngmonError::Contingency(format!("unknown contingency {contingency_id}"))
        })?;
        contingency.apply(network)?;

        // decisions of the preventive state and of this contingency up to this instant
        let mut replay: Vec<State> = self.crac.preventive_state().into_iter().collect();
        replay.extend(
            self.crac
                .states_of(contingency_id)
                .into_iter()
                .filter(|s| s.instant <= state.instant),
        );
        for decided in &replay {
            self.apply_decided_actions(network, decided)?;
        }

        self.evaluator().evaluate(state, network)
    }

    /// Re-apply the network and range actions the optimization activated at `state`.
    fn apply_decided_actions(&self, network: &mut Network, state: &State) -> AngmonResult<()> {
        for id in self.optimization.activated_network_actions(state) {
            let action = self.crac.network_action(&id).ok_or_else(|| {
                AngmonError::Validation(format!("activated network action {id} is not in the catalog"))
            })?;
            action.apply(network)?;
        }
        for id in self.optimization.activated_range_actions(state) {
            let action = self.crac.range_action(&id).ok_or_else(|| {
                AngmonError::Validation(format!("activated range action {id} is not in the catalog"))
            })?;
            let setpoint = self.optimization.optimized_setpoint(state, &id).ok_or_else(|| {
                AngmonError::MissingResult(format!(
                    "no optimized set-point for range action {id} at state {state}"
                ))
            })?;
            action.apply(network, setpoint)?;
        }
        Ok(())
    }

    fn unknown_on_error(&self, state: &State, outcome: AngmonResult<ScenarioResult>) -> ScenarioResult {
        match outcome {
            Ok(result) => result,
            Err(err) => {
                warn!("Angle monitoring failed at state {}: {}", state, err);
                ScenarioResult::unknown(state, self.crac.angle_cnecs_for(state))
            }
        }
    }
}
