//! Remedial actions: network actions built from elementary actions, and
//! phase-shifter range actions.

use crate::state::Instant;
use angmon_core::{AngmonError, AngmonResult, Degrees, Megawatts, Network, Node};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Injection families a set-point can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionKind {
    Generator,
    Load,
    DanglingLine,
    ShuntCompensator,
}

/// New active power (MW) for a generator, load or dangling line, or a section
/// count for a shunt compensator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionSetpoint {
    pub kind: InjectionKind,
    pub element_id: String,
    pub setpoint: f64,
}

impl InjectionSetpoint {
    pub fn generator(element_id: impl Into<String>, setpoint_mw: f64) -> Self {
        Self {
            kind: InjectionKind::Generator,
            element_id: element_id.into(),
            setpoint: setpoint_mw,
        }
    }

    pub fn load(element_id: impl Into<String>, setpoint_mw: f64) -> Self {
        Self {
            kind: InjectionKind::Load,
            element_id: element_id.into(),
            setpoint: setpoint_mw,
        }
    }

    fn unknown(&self) -> AngmonError {
        AngmonError::Network(format!(
            "no {:?} injection named {} in network",
            self.kind, self.element_id
        ))
    }

    pub fn apply(&self, network: &mut Network) -> AngmonResult<()> {
        let node = network
            .injection_mut(&self.element_id)
            .ok_or_else(|| self.unknown())?;
        match (self.kind, node) {
            (InjectionKind::Generator, Node::Gen(gen)) => gen.target_p = Megawatts(self.setpoint),
            (InjectionKind::Load, Node::Load(load)) => load.p0 = Megawatts(self.setpoint),
            (InjectionKind::DanglingLine, Node::DanglingLine(line)) => {
                line.p0 = Megawatts(self.setpoint)
            }
            (InjectionKind::ShuntCompensator, Node::Shunt(shunt)) => {
                let sections = self.setpoint.round();
                if sections < 0.0 || sections > f64::from(shunt.maximum_section_count) {
                    return Err(AngmonError::Validation(format!(
                        "section count {} out of range [0, {}] for shunt {}",
                        self.setpoint, shunt.maximum_section_count, shunt.name
                    )));
                }
                shunt.section_count = sections as u32;
            }
            _ => return Err(self.unknown()),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementaryAction {
    Injection(InjectionSetpoint),
    /// Open or close the terminals of a branch or injection.
    TerminalsConnection { element_id: String, open: bool },
}

impl ElementaryAction {
    pub fn element_id(&self) -> &str {
        match self {
            ElementaryAction::Injection(setpoint) => &setpoint.element_id,
            ElementaryAction::TerminalsConnection { element_id, .. } => element_id,
        }
    }

    pub fn apply(&self, network: &mut Network) -> AngmonResult<()> {
        match self {
            ElementaryAction::Injection(setpoint) => setpoint.apply(network),
            ElementaryAction::TerminalsConnection { element_id, open } => {
                if let Some(branch) = network.branch_mut(element_id) {
                    branch.in_service = !open;
                    return Ok(());
                }
                match network.injection_mut(element_id) {
                    Some(Node::Gen(g)) => g.connected = !open,
                    Some(Node::Load(l)) => l.connected = !open,
                    Some(Node::DanglingLine(d)) => d.connected = !open,
                    Some(Node::Shunt(s)) => s.connected = !open,
                    _ => {
                        return Err(AngmonError::Network(format!(
                            "no switchable element named {element_id} in network"
                        )))
                    }
                }
                Ok(())
            }
        }
    }
}

/// Condition under which a remedial action is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UsageRule {
    OnInstant { instant: Instant },
    OnConstraint { instant: Instant, cnec_id: String },
}

impl UsageRule {
    /// True for an on-constraint rule naming `cnec_id`, whatever instant it carries.
    pub fn references(&self, cnec_id: &str) -> bool {
        matches!(self, UsageRule::OnConstraint { cnec_id: c, .. } if c == cnec_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAction {
    pub id: String,
    pub elementary_actions: Vec<ElementaryAction>,
    pub usage_rules: Vec<UsageRule>,
}

impl NetworkAction {
    pub fn new(id: impl Into<String>, elementary_actions: Vec<ElementaryAction>) -> Self {
        Self {
            id: id.into(),
            elementary_actions,
            usage_rules: Vec::new(),
        }
    }

    pub fn with_usage_rule(mut self, rule: UsageRule) -> Self {
        self.usage_rules.push(rule);
        self
    }

    /// Apply every elementary action; stops at the first failure.
    pub fn apply(&self, network: &mut Network) -> AngmonResult<()> {
        debug!(action = %self.id, elements = self.elementary_actions.len(), "applying network action");
        for action in &self.elementary_actions {
            action.apply(network)?;
        }
        Ok(())
    }

    pub fn network_elements(&self) -> impl Iterator<Item = &str> {
        self.elementary_actions.iter().map(ElementaryAction::element_id)
    }
}

/// Phase-shifting transformer tap expressed as an angle set-point on a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeAction {
    pub id: String,
    pub branch_id: String,
    pub min_deg: f64,
    pub max_deg: f64,
    pub usage_rules: Vec<UsageRule>,
}

impl RangeAction {
    pub fn new(id: impl Into<String>, branch_id: impl Into<String>, min_deg: f64, max_deg: f64) -> Self {
        Self {
            id: id.into(),
            branch_id: branch_id.into(),
            min_deg,
            max_deg,
            usage_rules: Vec::new(),
        }
    }

    pub fn apply(&self, network: &mut Network, setpoint_deg: f64) -> AngmonResult<()> {
        if !(self.min_deg..=self.max_deg).contains(&setpoint_deg) {
            return Err(AngmonError::Validation(format!(
                "set-point {setpoint_deg}° of range action {} outside [{}, {}]",
                self.id, self.min_deg, self.max_deg
            )));
        }
        let branch = network.branch_mut(&self.branch_id).ok_or_else(|| {
            AngmonError::Network(format!(
                "range action {} targets unknown branch {}",
                self.id, self.branch_id
            ))
        })?;
        branch.phase_shift = Degrees(setpoint_deg).to_radians();
        debug!(action = %self.id, branch = %self.branch_id, setpoint_deg, "applied range action");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemedialAction {
    Network(NetworkAction),
    Range(RangeAction),
}

impl RemedialAction {
    pub fn id(&self) -> &str {
        match self {
            RemedialAction::Network(action) => &action.id,
            RemedialAction::Range(action) => &action.id,
        }
    }

    pub fn usage_rules(&self) -> &[UsageRule] {
        match self {
            RemedialAction::Network(action) => &action.usage_rules,
            RemedialAction::Range(action) => &action.usage_rules,
        }
    }

    pub fn as_network_action(&self) -> Option<&NetworkAction> {
        match self {
            RemedialAction::Network(action) => Some(action),
            RemedialAction::Range(_) => None,
        }
    }
}
