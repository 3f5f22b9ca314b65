//! # angmon-monitoring: angle-security monitoring
//!
//! Checks phase-angle constraints on the preventive state and every
//! post-contingency state of a catalog. When a constraint is violated after an
//! outage, the remedial actions attached to it are validated and applied, the
//! power they moved is redispatched inside each country, and the state is
//! solved and checked again.
//!
//! ## Flow
//!
//! 1. [`AngleMonitoring::run`] evaluates the preventive state on the input
//!    network, then fans the post-contingency states out over a [`NetworkPool`]
//!    of clones on a rayon thread pool.
//! 2. [`ScenarioEvaluator`] runs the per-state loop, using
//!    [`validate_elementary_action`] and a [`RedispatchStrategy`]
//!    ([`AutoRedispatch`] or [`GlskRedispatch`]).
//! 3. [`AngleMonitoringResult`] merges the per-state results, and
//!    [`ResultWithAngleMonitoring`] exposes them through the optimization
//!    result read contract.
//!
//! Divergence and per-state errors never abort the run: they become
//! `Divergent` and `Unknown` states, which the global status treats as
//! inconclusive.

pub mod cancel;
pub mod evaluator;
pub mod logging;
pub mod overlay;
pub mod params;
pub mod pool;
pub mod redispatch;
pub mod result;
pub mod scheduler;
pub mod validator;

pub use cancel::CancellationFlag;
pub use evaluator::{compute_angle, ScenarioEvaluator};
pub use overlay::ResultWithAngleMonitoring;
pub use params::{MonitoringParameters, RedispatchParameters};
pub use pool::{NetworkPool, PooledNetwork};
pub use redispatch::{
    AutoRedispatch, GlskDocument, GlskPoint, GlskRedispatch, RedispatchOutcome,
    RedispatchStrategy, ShiftKey, ShiftKeyKind,
};
pub use result::{
    aggregate_status, AngleMonitoringResult, AngleResult, MonitoringStatus, ScenarioResult,
};
pub use scheduler::AngleMonitoring;
pub use validator::{validate_elementary_action, Rejection, ValidatedInjection, Validation};
