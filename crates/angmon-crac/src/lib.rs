//! # angmon-crac: constraints and remedial actions
//!
//! The catalog side of angle monitoring: optimization instants and states,
//! angle constraints (cnecs) with degree thresholds, remedial actions with
//! their usage rules, and the read contract of the upstream optimization
//! whose decisions are replayed before monitoring.

pub mod cnec;
pub mod crac;
pub mod optimization;
pub mod remedial_action;
pub mod state;

pub use cnec::{AngleCnec, AngleThreshold, PhysicalParameter, Unit};
pub use crac::Crac;
pub use optimization::{
    ComputationStatus, OptimizationResult, RecordedOptimizationResult, StateDecisions,
};
pub use remedial_action::{
    ElementaryAction, InjectionKind, InjectionSetpoint, NetworkAction, RangeAction,
    RemedialAction, UsageRule,
};
pub use state::{Instant, State};
