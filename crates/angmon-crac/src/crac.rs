use crate::cnec::AngleCnec;
use crate::remedial_action::{NetworkAction, RangeAction, RemedialAction};
use crate::state::{Instant, State};
use angmon_core::{AngmonError, AngmonResult, Contingency};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Catalog of contingencies, angle constraints and remedial actions.
///
/// Built upstream and read-only to the monitoring engine. Insertion checks the
/// references between entries so lookups never dangle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Crac {
    pub id: String,
    instants: BTreeSet<Instant>,
    contingencies: BTreeMap<String, Contingency>,
    angle_cnecs: BTreeMap<String, AngleCnec>,
    remedial_actions: BTreeMap<String, RemedialAction>,
}

impl Crac {
    pub fn new(id: impl Into<String>, instants: impl IntoIterator<Item = Instant>) -> Self {
        Self {
            id: id.into(),
            instants: instants.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn instants(&self) -> impl Iterator<Item = Instant> + '_ {
        self.instants.iter().copied()
    }

    pub fn has_instant(&self, instant: Instant) -> bool {
        self.instants.contains(&instant)
    }

    pub fn add_contingency(&mut self, contingency: Contingency) {
        self.contingencies
            .insert(contingency.id.clone(), contingency);
    }

    pub fn add_angle_cnec(&mut self, cnec: AngleCnec) -> AngmonResult<()> {
        if !self.has_instant(cnec.state.instant) {
            return Err(AngmonError::Validation(format!(
                "AngleCnec {} uses undeclared instant {}",
                cnec.id, cnec.state.instant
            )));
        }
        match (&cnec.state.contingency, cnec.state.instant) {
            (None, Instant::Preventive) => {}
            (Some(co), instant) if !instant.is_preventive() => {
                if !self.contingencies.contains_key(co) {
                    return Err(AngmonError::Validation(format!(
                        "AngleCnec {} references unknown contingency {}",
                        cnec.id, co
                    )));
                }
            }
            _ => {
                return Err(AngmonError::Validation(format!(
                    "AngleCnec {} has an inconsistent state {}",
                    cnec.id, cnec.state
                )))
            }
        }
        self.angle_cnecs.insert(cnec.id.clone(), cnec);
        Ok(())
    }

    pub fn add_remedial_action(&mut self, action: RemedialAction) -> AngmonResult<()> {
        if self.remedial_actions.contains_key(action.id()) {
            return Err(AngmonError::Validation(format!(
                "duplicate remedial action {}",
                action.id()
            )));
        }
        self.remedial_actions
            .insert(action.id().to_string(), action);
        Ok(())
    }

    /// The preventive state, when the preventive instant is declared.
    pub fn preventive_state(&self) -> Option<State> {
        self.has_instant(Instant::Preventive)
            .then(State::preventive)
    }

    pub fn contingency(&self, id: &str) -> Option<&Contingency> {
        self.contingencies.get(id)
    }

    pub fn contingencies(&self) -> impl Iterator<Item = &Contingency> {
        self.contingencies.values()
    }

    pub fn angle_cnec(&self, id: &str) -> Option<&AngleCnec> {
        self.angle_cnecs.get(id)
    }

    pub fn angle_cnecs(&self) -> impl Iterator<Item = &AngleCnec> {
        self.angle_cnecs.values()
    }

    pub fn angle_cnecs_for<'a>(&'a self, state: &'a State) -> impl Iterator<Item = &'a AngleCnec> {
        self.angle_cnecs.values().filter(move |c| &c.state == state)
    }

    /// Distinct post-contingency states holding at least one angle constraint.
    pub fn contingency_states_with_angle_cnecs(&self) -> BTreeSet<State> {
        self.angle_cnecs
            .values()
            .filter(|c| !c.state.is_preventive())
            .map(|c| c.state.clone())
            .collect()
    }

    /// Every declared state of a contingency, in chronological order.
    pub fn states_of(&self, contingency_id: &str) -> Vec<State> {
        self.instants
            .iter()
            .filter(|i| !i.is_preventive())
            .map(|i| State::post_contingency(contingency_id, *i))
            .collect()
    }

    /// Remedial actions with an on-constraint usage rule naming this cnec.
    pub fn remedial_actions_on_constraint(&self, cnec: &AngleCnec) -> Vec<&RemedialAction> {
        self.remedial_actions
            .values()
            .filter(|ra| {
                ra.usage_rules()
                    .iter()
                    .any(|rule| rule.references(&cnec.id))
            })
            .collect()
    }

    pub fn remedial_action(&self, id: &str) -> Option<&RemedialAction> {
        self.remedial_actions.get(id)
    }

    pub fn network_action(&self, id: &str) -> Option<&NetworkAction> {
        self.remedial_action(id)?.as_network_action()
    }

    pub fn range_action(&self, id: &str) -> Option<&RangeAction> {
        match self.remedial_action(id)? {
            RemedialAction::Range(action) => Some(action),
            RemedialAction::Network(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cnec::AngleThreshold;
    use crate::remedial_action::{ElementaryAction, InjectionSetpoint, UsageRule};
    use angmon_core::ContingencyElement;

    fn crac() -> Crac {
        let mut crac = Crac::new(
            "crac",
            [Instant::Preventive, Instant::Outage, Instant::Curative],
        );
        crac.add_contingency(Contingency::new("co1", vec![ContingencyElement::branch("L1")]));
        crac.add_angle_cnec(AngleCnec::new(
            "ac1",
            State::post_contingency("co1", Instant::Curative),
            "VL1",
            "VL2",
            vec![AngleThreshold::between(-60.0, 60.0)],
        ))
        .unwrap();
        crac.add_remedial_action(RemedialAction::Network(
            NetworkAction::new(
                "ra1",
                vec![ElementaryAction::Injection(InjectionSetpoint::load("LD1", 10.0))],
            )
            .with_usage_rule(UsageRule::OnConstraint {
                instant: Instant::Curative,
                cnec_id: "ac1".into(),
            }),
        ))
        .unwrap();
        crac
    }

    #[test]
    fn states_and_lookups() {
        let crac = crac();
        assert_eq!(crac.preventive_state(), Some(State::preventive()));
        let states = crac.contingency_states_with_angle_cnecs();
        assert_eq!(states.len(), 1);
        let state = states.iter().next().unwrap();
        assert_eq!(crac.angle_cnecs_for(state).count(), 1);
        assert_eq!(crac.states_of("co1").len(), 2);
        assert!(crac.network_action("ra1").is_some());
        assert!(crac.range_action("ra1").is_none());
    }

    #[test]
    fn actions_on_constraint() {
        let crac = crac();
        let cnec = crac.angle_cnec("ac1").unwrap();
        let ids: Vec<&str> = crac
            .remedial_actions_on_constraint(cnec)
            .iter()
            .map(|ra| ra.id())
            .collect();
        assert_eq!(ids, ["ra1"]);
    }

    #[test]
    fn on_constraint_rule_instant_does_not_filter() {
        let mut crac = crac();
        crac.add_remedial_action(RemedialAction::Network(
            NetworkAction::new(
                "ra_auto",
                vec![ElementaryAction::Injection(InjectionSetpoint::load("LD1", 20.0))],
            )
            .with_usage_rule(UsageRule::OnConstraint {
                instant: Instant::Auto,
                cnec_id: "ac1".into(),
            }),
        ))
        .unwrap();
        let cnec = crac.angle_cnec("ac1").unwrap();
        let mut ids: Vec<&str> = crac
            .remedial_actions_on_constraint(cnec)
            .iter()
            .map(|ra| ra.id())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, ["ra1", "ra_auto"]);
    }

    #[test]
    fn rejects_dangling_references() {
        let mut crac = crac();
        let bad_co = AngleCnec::new(
            "ac2",
            State::post_contingency("nope", Instant::Curative),
            "VL1",
            "VL2",
            vec![],
        );
        assert!(crac.add_angle_cnec(bad_co).is_err());
        let bad_instant = AngleCnec::new(
            "ac3",
            State::post_contingency("co1", Instant::Auto),
            "VL1",
            "VL2",
            vec![],
        );
        assert!(crac.add_angle_cnec(bad_instant).is_err());
        let dup = crac.remedial_action("ra1").cloned().unwrap();
        assert!(crac.add_remedial_action(dup).is_err());
    }

    #[test]
    fn no_preventive_instant_means_no_preventive_state() {
        let crac = Crac::new("c", [Instant::Outage, Instant::Curative]);
        assert!(crac.preventive_state().is_none());
    }
}
