use crate::result::AngleMonitoringResult;
use angmon_core::{AngmonError, AngmonResult};
use angmon_crac::{
    AngleCnec, ComputationStatus, Instant, OptimizationResult, PhysicalParameter, State, Unit,
};
use std::collections::BTreeSet;

/// An optimization result with angle monitoring layered on top.
///
/// Angle and margin queries are answered from the monitoring result and only
/// at the curative instant. Everything else delegates to the wrapped result,
/// with the remedial actions applied by monitoring added to the activated
/// network actions.
#[derive(Debug, Clone)]
pub struct ResultWithAngleMonitoring<R> {
    inner: R,
    angle_result: AngleMonitoringResult,
}

impl<R: OptimizationResult> ResultWithAngleMonitoring<R> {
    pub fn new(inner: R, angle_result: AngleMonitoringResult) -> Self {
        Self {
            inner,
            angle_result,
        }
    }

    pub fn angle_monitoring_result(&self) -> &AngleMonitoringResult {
        &self.angle_result
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_parts(self) -> (R, AngleMonitoringResult) {
        (self.inner, self.angle_result)
    }

    fn check_curative(instant: Instant) -> AngmonResult<()> {
        if instant == Instant::Curative {
            Ok(())
        } else {
            Err(AngmonError::InvalidInstant(format!(
                "Unexpected optimization instant for angle monitoring result (only curative instant is supported currently) : {instant}"
            )))
        }
    }
}

impl<R: OptimizationResult> OptimizationResult for ResultWithAngleMonitoring<R> {
    fn computation_status(&self) -> ComputationStatus {
        if self.angle_result.is_divergent() || self.angle_result.is_unknown() {
            ComputationStatus::Failure
        } else {
            self.inner.computation_status()
        }
    }

    fn activated_network_actions(&self, state: &State) -> BTreeSet<String> {
        let mut actions = self.inner.activated_network_actions(state);
        actions.extend(self.angle_result.applied_actions(state));
        actions
    }

    fn activated_range_actions(&self, state: &State) -> BTreeSet<String> {
        self.inner.activated_range_actions(state)
    }

    fn optimized_setpoint(&self, state: &State, range_action_id: &str) -> Option<f64> {
        self.inner.optimized_setpoint(state, range_action_id)
    }

    fn angle(&self, instant: Instant, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64> {
        Self::check_curative(instant)?;
        self.angle_result.angle(cnec, unit)
    }

    fn margin(&self, instant: Instant, cnec: &AngleCnec, unit: Unit) -> AngmonResult<f64> {
        Self::check_curative(instant)?;
        self.angle_result.margin(cnec, unit)
    }

    fn is_secure(&self, parameters: &[PhysicalParameter]) -> bool {
        let others: Vec<PhysicalParameter> = parameters
            .iter()
            .copied()
            .filter(|p| *p != PhysicalParameter::Angle)
            .collect();
        let angle_ok = !parameters.contains(&PhysicalParameter::Angle) || self.angle_result.is_secure();
        angle_ok && self.inner.is_secure(&others)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{AngleResult, MonitoringStatus, ScenarioResult};
    use angmon_crac::{AngleThreshold, RecordedOptimizationResult};

    fn curative() -> State {
        State::post_contingency("co", Instant::Curative)
    }

    fn cnec() -> AngleCnec {
        AngleCnec::new("ac", curative(), "VL1", "VL2", vec![AngleThreshold::between(-60.0, 60.0)])
    }

    fn angle_result(status: MonitoringStatus) -> AngleMonitoringResult {
        let mut scenario = ScenarioResult::new(
            curative(),
            vec![AngleResult {
                cnec: cnec(),
                angle_deg: 30.0,
            }],
            status,
        );
        scenario.applied_actions.insert("ra_angle".into());
        AngleMonitoringResult::aggregate(vec![scenario])
    }

    fn inner() -> RecordedOptimizationResult {
        let mut inner = RecordedOptimizationResult::new();
        inner.activate_network_action(&curative(), "ra_rao");
        inner
    }

    #[test]
    fn status_fails_on_divergent_or_unknown() {
        for (status, expected) in [
            (MonitoringStatus::Divergent, ComputationStatus::Failure),
            (MonitoringStatus::Unknown, ComputationStatus::Failure),
            (MonitoringStatus::Unsecure, ComputationStatus::Default),
            (MonitoringStatus::Secure, ComputationStatus::Default),
        ] {
            let overlay = ResultWithAngleMonitoring::new(inner(), angle_result(status));
            assert_eq!(overlay.computation_status(), expected);
        }
    }

    #[test]
    fn activated_actions_are_merged() {
        let overlay = ResultWithAngleMonitoring::new(inner(), angle_result(MonitoringStatus::Secure));
        let actions = overlay.activated_network_actions(&curative());
        assert!(actions.contains("ra_rao"));
        assert!(actions.contains("ra_angle"));
        assert!(overlay.activated_network_actions(&State::preventive()).is_empty());
    }

    #[test]
    fn angle_only_at_curative() {
        let overlay = ResultWithAngleMonitoring::new(inner(), angle_result(MonitoringStatus::Secure));
        assert_eq!(overlay.angle(Instant::Curative, &cnec(), Unit::Degree).unwrap(), 30.0);
        assert!((overlay.margin(Instant::Curative, &cnec(), Unit::Degree).unwrap() - 30.0).abs() < 1e-12);
        assert!(matches!(
            overlay.angle(Instant::Outage, &cnec(), Unit::Degree),
            Err(AngmonError::InvalidInstant(_))
        ));
        assert!(overlay.margin(Instant::Preventive, &cnec(), Unit::Degree).is_err());
    }

    #[test]
    fn security_folds_angle_verdict() {
        let mut flow_unsecure = inner();
        flow_unsecure.mark_unsecure(PhysicalParameter::Flow);

        let secure = ResultWithAngleMonitoring::new(inner(), angle_result(MonitoringStatus::Secure));
        assert!(secure.is_secure(&[PhysicalParameter::Angle, PhysicalParameter::Flow]));

        let unsecure = ResultWithAngleMonitoring::new(inner(), angle_result(MonitoringStatus::Unsecure));
        assert!(!unsecure.is_secure(&[PhysicalParameter::Angle]));
        assert!(unsecure.is_secure(&[PhysicalParameter::Flow]));

        let flow = ResultWithAngleMonitoring::new(flow_unsecure, angle_result(MonitoringStatus::Secure));
        assert!(flow.is_secure(&[PhysicalParameter::Angle]));
        assert!(!flow.is_secure(&[PhysicalParameter::Angle, PhysicalParameter::Flow]));
    }
}
