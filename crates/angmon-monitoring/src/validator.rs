//! Eligibility check and power delta of a single elementary action.

use angmon_core::{AngmonError, AngmonResult, Country, Megawatts, Network, Node};
use angmon_crac::{ElementaryAction, InjectionKind};
use std::collections::BTreeSet;
use std::fmt;

/// An elementary action cleared for application.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInjection {
    pub country: Country,
    /// Power to redispatch in `country`; positive means generation must go up.
    pub power_delta: Megawatts,
    pub element_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NotInjectionSetpoint,
    UnknownElement(String),
    NoSubstation,
    NoCountry,
    NotGeneratorOrLoad,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotInjectionSetpoint => {
                f.write_str("it has an elementary action that's not an injection setpoint")
            }
            Rejection::UnknownElement(id) => write!(f, "network element {id} was not found"),
            Rejection::NoSubstation => f.write_str("it doesn't have a substation"),
            Rejection::NoCountry => f.write_str("it doesn't have a country"),
            Rejection::NotGeneratorOrLoad => f.write_str("it is neither a generator nor a load"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Accepted(ValidatedInjection),
    Rejected(Rejection),
}

/// Check one elementary action against the network it would be applied to.
///
/// Rejections are per-action outcomes. A country missing from `covered_countries`
/// is a configuration error and is returned as `Err`.
pub fn validate_elementary_action(
    action: &ElementaryAction,
    network: &Network,
    covered_countries: &BTreeSet<Country>,
) -> AngmonResult<Validation> {
    let setpoint = match action {
        ElementaryAction::Injection(setpoint) => setpoint,
        ElementaryAction::TerminalsConnection { .. } => {
            return Ok(Validation::Rejected(Rejection::NotInjectionSetpoint))
        }
    };

    let previous = match (setpoint.kind, network.injection(&setpoint.element_id)) {
        (InjectionKind::Generator, Some(Node::Gen(g))) => Some(g.target_p),
        (InjectionKind::Load, Some(Node::Load(l))) => Some(l.p0),
        (InjectionKind::DanglingLine, Some(Node::DanglingLine(_)))
        | (InjectionKind::ShuntCompensator, Some(Node::Shunt(_))) => None,
        _ => {
            return Ok(Validation::Rejected(Rejection::UnknownElement(
                setpoint.element_id.clone(),
            )))
        }
    };

    let Some(substation) = network.injection_substation(&setpoint.element_id) else {
        return Ok(Validation::Rejected(Rejection::NoSubstation));
    };
    let Some(country) = substation.country.clone() else {
        return Ok(Validation::Rejected(Rejection::NoCountry));
    };
    if !covered_countries.contains(&country) {
        return Err(AngmonError::Config(format!(
            "INFEASIBLE Angle Monitoring : Glsks were not defined for country {country}. \
             Injection {} cannot be compensated.",
            setpoint.element_id
        )));
    }

    let requested = Megawatts(setpoint.setpoint);
    let power_delta = match (setpoint.kind, previous) {
        (InjectionKind::Generator, Some(previous)) => previous - requested,
        (InjectionKind::Load, Some(previous)) => requested - previous,
        _ => return Ok(Validation::Rejected(Rejection::NotGeneratorOrLoad)),
    };

    Ok(Validation::Accepted(ValidatedInjection {
        country,
        power_delta,
        element_id: setpoint.element_id.clone(),
    }))
}
