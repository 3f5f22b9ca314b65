use super::{RedispatchOutcome, RedispatchStrategy};
use crate::params::RedispatchParameters;
use angmon_core::{main_synchronous_component, AngmonResult, Country, Megawatts, Network, Node};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Proportional redispatch over the generators of a country.
///
/// Each connected generator of the main synchronous component gets a share
/// of the delta weighted by `max(epsilon, |target_p|)`. Generators that hit
/// a limit are frozen and the remainder is spread over the others, for at
/// most `max_iterations` rounds.
#[derive(Debug, Clone)]
pub struct AutoRedispatch {
    countries: BTreeSet<Country>,
    epsilon_mw: f64,
    max_iterations: usize,
}

struct Candidate {
    name: String,
    weight: f64,
    initial: f64,
    current: f64,
    pmin: f64,
    pmax: f64,
    frozen: bool,
}

impl AutoRedispatch {
    pub fn new(countries: impl IntoIterator<Item = Country>) -> Self {
        Self::from_parameters(&RedispatchParameters {
            countries: countries.into_iter().collect(),
            ..RedispatchParameters::default()
        })
    }

    pub fn from_parameters(parameters: &RedispatchParameters) -> Self {
        Self {
            countries: parameters.countries.clone(),
            epsilon_mw: parameters.epsilon_mw,
            max_iterations: parameters.max_iterations.max(1),
        }
    }

    fn candidates(
        &self,
        network: &Network,
        country: &Country,
        exclusions: &BTreeSet<String>,
    ) -> Vec<Candidate> {
        let main: HashSet<_> = main_synchronous_component(network).into_iter().collect();
        network
            .graph
            .node_weights()
            .filter_map(|node| match node {
                Node::Gen(g) if g.connected => Some(g),
                _ => None,
            })
            .filter(|g| main.contains(&g.bus))
            .filter(|g| !exclusions.contains(&g.name))
            .filter(|g| network.bus_country(g.bus).as_ref() == Some(country))
            .map(|g| Candidate {
                name: g.name.clone(),
                weight: g.target_p.value().abs().max(self.epsilon_mw),
                initial: g.target_p.value(),
                current: g.target_p.value(),
                pmin: g.pmin.value(),
                pmax: g.pmax.value(),
                frozen: false,
            })
            .collect()
    }
}

impl RedispatchStrategy for AutoRedispatch {
    fn name(&self) -> &'static str {
        "auto"
    }

    fn covered_countries(&self) -> BTreeSet<Country> {
        self.countries.clone()
    }

    fn redispatch(
        &self,
        network: &mut Network,
        country: &Country,
        delta: Megawatts,
        exclusions: &BTreeSet<String>,
    ) -> AngmonResult<RedispatchOutcome> {
        let mut candidates = self.candidates(network, country, exclusions);
        if candidates.is_empty() {
            debug!(country = %country, "no generator available for redispatch");
            return Ok(RedispatchOutcome::empty(country, delta));
        }

        let mut remaining = delta.value();
        for round in 0..self.max_iterations {
            let total_weight: f64 = candidates
                .iter()
                .filter(|c| !c.frozen)
                .map(|c| c.weight)
                .sum();
            if remaining.abs() < 1e-9 || total_weight <= 0.0 {
                break;
            }
            let mut moved = 0.0;
            for candidate in candidates.iter_mut().filter(|c| !c.frozen) {
                let wanted = candidate.current + remaining * candidate.weight / total_weight;
                let bounded = wanted.max(candidate.pmin).min(candidate.pmax);
                if bounded != wanted {
                    candidate.frozen = true;
                }
                moved += bounded - candidate.current;
                candidate.current = bounded;
            }
            remaining -= moved;
            debug!(round, moved, remaining, "redispatch round");
        }

        let mut outcome = RedispatchOutcome::empty(country, delta);
        for candidate in &candidates {
            let shift = candidate.current - candidate.initial;
            if shift == 0.0 {
                continue;
            }
            if let Some(gen) = network.generator_mut(&candidate.name) {
                gen.target_p = Megawatts(candidate.current);
            }
            outcome.realized += Megawatts(shift);
            outcome.shifts.insert(candidate.name.clone(), Megawatts(shift));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use angmon_core::{Bus, BusId, Gen, GenId, Kilovolts, Substation, VoltageLevel};

    fn network() -> Network {
        let mut network = Network::new();
        network.add_substation(Substation::new("S_FR", Some("FR".parse().unwrap())));
        network.add_substation(Substation::new("S_BE", Some("BE".parse().unwrap())));
        network.add_voltage_level(VoltageLevel::new("VL_FR", Some("S_FR"), Kilovolts(400.0)));
        network.add_voltage_level(VoltageLevel::new("VL_BE", Some("S_BE"), Kilovolts(400.0)));
        network.add_bus(Bus::new(BusId::new(1), "B_FR", "VL_FR"));
        network.add_bus(Bus::new(BusId::new(2), "B_BE", "VL_BE"));
        network
            .add_branch(angmon_core::Branch::new(
                angmon_core::BranchId::new(1),
                "L",
                BusId::new(1),
                BusId::new(2),
                0.1,
            ))
            .unwrap();
        network.add_node(Node::Gen(
            Gen::new(GenId::new(1), "G1", BusId::new(1)).with_target_p(300.0),
        ));
        network.add_node(Node::Gen(
            Gen::new(GenId::new(2), "G2", BusId::new(1)).with_target_p(100.0),
        ));
        network.add_node(Node::Gen(
            Gen::new(GenId::new(3), "G_BE", BusId::new(2)).with_target_p(500.0),
        ));
        network
    }

    fn fr() -> Country {
        "FR".parse().unwrap()
    }

    fn target(network: &Network, id: &str) -> f64 {
        network.generator(id).unwrap().target_p.value()
    }

    #[test]
    fn shares_follow_current_output() {
        let mut network = network();
        let strategy = AutoRedispatch::new([fr()]);
        let outcome = strategy
            .redispatch(&mut network, &fr(), Megawatts(40.0), &BTreeSet::new())
            .unwrap();
        assert!((target(&network, "G1") - 330.0).abs() < 1e-9);
        assert!((target(&network, "G2") - 110.0).abs() < 1e-9);
        assert_eq!(target(&network, "G_BE"), 500.0);
        assert!(outcome.shortfall().value() < 1e-9);
    }

    #[test]
    fn excluded_generator_is_left_alone() {
        let mut network = network();
        let exclusions = BTreeSet::from(["G1".to_string()]);
        let outcome = AutoRedispatch::new([fr()])
            .redispatch(&mut network, &fr(), Megawatts(-50.0), &exclusions)
            .unwrap();
        assert_eq!(target(&network, "G1"), 300.0);
        assert!((target(&network, "G2") - 50.0).abs() < 1e-9);
        assert!(!outcome.shifts.contains_key("G1"));
    }

    #[test]
    fn limits_push_remainder_to_others() {
        let mut network = network();
        network.generator_mut("G2").unwrap().pmax = Megawatts(105.0);
        let outcome = AutoRedispatch::new([fr()])
            .redispatch(&mut network, &fr(), Megawatts(40.0), &BTreeSet::new())
            .unwrap();
        assert_eq!(target(&network, "G2"), 105.0);
        assert!((target(&network, "G1") - 335.0).abs() < 1e-9);
        assert!((outcome.realized.value() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn under_delivery_is_reported_not_failed() {
        let mut network = network();
        for id in ["G1", "G2"] {
            network.generator_mut(id).unwrap().pmax = Megawatts(target(&network, id) + 5.0);
        }
        let outcome = AutoRedispatch::new([fr()])
            .redispatch(&mut network, &fr(), Megawatts(40.0), &BTreeSet::new())
            .unwrap();
        assert!((outcome.realized.value() - 10.0).abs() < 1e-9);
        assert!((outcome.shortfall().value() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn zero_output_generators_still_get_a_share() {
        let mut network = network();
        network.generator_mut("G1").unwrap().target_p = Megawatts(0.0);
        network.generator_mut("G2").unwrap().target_p = Megawatts(0.0);
        AutoRedispatch::new([fr()])
            .redispatch(&mut network, &fr(), Megawatts(10.0), &BTreeSet::new())
            .unwrap();
        assert!((target(&network, "G1") - 5.0).abs() < 1e-9);
        assert!((target(&network, "G2") - 5.0).abs() < 1e-9);
    }

    #[test]
    fn country_without_generators_realizes_nothing() {
        let mut network = network();
        let de: Country = "DE".parse().unwrap();
        let outcome = AutoRedispatch::new([de.clone()])
            .redispatch(&mut network, &de, Megawatts(10.0), &BTreeSet::new())
            .unwrap();
        assert_eq!(outcome.realized, Megawatts(0.0));
    }
}
