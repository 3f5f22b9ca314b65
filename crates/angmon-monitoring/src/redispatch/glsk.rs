use super::{RedispatchOutcome, RedispatchStrategy};
use angmon_core::{AngmonError, AngmonResult, Country, Megawatts, Network, Node};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKeyKind {
    Generator,
    Load,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftKey {
    pub resource_id: String,
    pub kind: ShiftKeyKind,
    /// Share of the country delta, normalised over the usable keys.
    pub factor: f64,
}

/// Shift keys of one country over `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlskPoint {
    pub country: Country,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub shift_keys: Vec<ShiftKey>,
}

impl GlskPoint {
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlskDocument {
    #[serde(default)]
    pub points: Vec<GlskPoint>,
}

impl GlskDocument {
    pub fn from_path(path: &Path) -> AngmonResult<Self> {
        let data = fs::read_to_string(path)?;
        let parsed: Result<Self, anyhow::Error> = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => {
                serde_json::from_str(&data).context("parsing shift-key json")
            }
            _ => serde_yaml::from_str(&data).context("parsing shift-key yaml"),
        };
        parsed.map_err(|e| AngmonError::Parse(format!("{e:#}")))
    }

    pub fn countries(&self) -> BTreeSet<Country> {
        self.points.iter().map(|p| p.country.clone()).collect()
    }

    /// The single point of `country` valid at `at`.
    pub fn point_for(&self, country: &Country, at: DateTime<Utc>) -> AngmonResult<&GlskPoint> {
        let matching: Vec<&GlskPoint> = self
            .points
            .iter()
            .filter(|p| &p.country == country && p.covers(at))
            .collect();
        match matching.as_slice() {
            [point] => Ok(point),
            [] => Err(AngmonError::Config(format!(
                "no glskPoint defined for country {country} at {at}"
            ))),
            many => Err(AngmonError::Config(format!(
                "> 1 ({}) glskPoints defined for country {country}",
                many.len()
            ))),
        }
    }
}

/// Redispatch along externally supplied shift keys at a fixed timestamp.
#[derive(Debug, Clone)]
pub struct GlskRedispatch {
    document: GlskDocument,
    timestamp: DateTime<Utc>,
}

impl GlskRedispatch {
    pub fn new(document: GlskDocument, timestamp: DateTime<Utc>) -> Self {
        Self {
            document,
            timestamp,
        }
    }

    fn resolves(network: &Network, key: &ShiftKey) -> bool {
        match (key.kind, network.injection(&key.resource_id)) {
            (ShiftKeyKind::Generator, Some(Node::Gen(g))) => g.connected,
            (ShiftKeyKind::Load, Some(Node::Load(l))) => l.connected,
            _ => false,
        }
    }
}

impl RedispatchStrategy for GlskRedispatch {
    fn name(&self) -> &'static str {
        "glsk"
    }

    fn covered_countries(&self) -> BTreeSet<Country> {
        self.document.countries()
    }

    fn redispatch(
        &self,
        network: &mut Network,
        country: &Country,
        delta: Megawatts,
        exclusions: &BTreeSet<String>,
    ) -> AngmonResult<RedispatchOutcome> {
        let point = self.document.point_for(country, self.timestamp)?;

        // excluded resources are treated as unresolvable
        let usable: Vec<&ShiftKey> = point
            .shift_keys
            .iter()
            .filter(|key| key.factor > 0.0)
            .filter(|key| !exclusions.contains(&key.resource_id))
            .filter(|key| {
                let ok = Self::resolves(network, key);
                if !ok {
                    debug!(resource = %key.resource_id, "shift key resource not usable");
                }
                ok
            })
            .collect();
        let total: f64 = usable.iter().map(|key| key.factor).sum();
        if usable.is_empty() || total <= 0.0 {
            warn!(country = %country, "no usable shift key");
            return Ok(RedispatchOutcome::empty(country, delta));
        }

        let mut outcome = RedispatchOutcome::empty(country, delta);
        for key in usable {
            let share = delta * (key.factor / total);
            match network.injection_mut(&key.resource_id) {
                Some(Node::Gen(g)) => g.target_p += share,
                Some(Node::Load(l)) => l.p0 -= share,
                _ => continue,
            }
            outcome.realized += share;
            outcome.shifts.insert(key.resource_id.clone(), share);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use angmon_core::{Bus, BusId, Gen, GenId, Kilovolts, Load, LoadId, Substation, VoltageLevel};
    use chrono::TimeZone;
    use std::io::Write;

    fn fr() -> Country {
        "FR".parse().unwrap()
    }

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, h, 0, 0).unwrap()
    }

    fn point(start: u32, end: u32, keys: Vec<ShiftKey>) -> GlskPoint {
        GlskPoint {
            country: fr(),
            start: hour(start),
            end: hour(end),
            shift_keys: keys,
        }
    }

    fn key(id: &str, kind: ShiftKeyKind, factor: f64) -> ShiftKey {
        ShiftKey {
            resource_id: id.into(),
            kind,
            factor,
        }
    }

    fn network() -> Network {
        let mut network = Network::new();
        network.add_substation(Substation::new("S", Some(fr())));
        network.add_voltage_level(VoltageLevel::new("VL", Some("S"), Kilovolts(400.0)));
        network.add_bus(Bus::new(BusId::new(1), "B", "VL"));
        network.add_node(Node::Gen(
            Gen::new(GenId::new(1), "G1", BusId::new(1)).with_target_p(100.0),
        ));
        network.add_node(Node::Gen(
            Gen::new(GenId::new(2), "G2", BusId::new(1)).with_target_p(100.0),
        ));
        network.add_node(Node::Load(Load::new(LoadId::new(1), "LD", BusId::new(1), 200.0)));
        network
    }

    #[test]
    fn window_is_start_inclusive_end_exclusive() {
        let p = point(0, 12, vec![]);
        assert!(p.covers(hour(0)));
        assert!(p.covers(hour(11)));
        assert!(!p.covers(hour(12)));
    }

    #[test]
    fn exactly_one_point_is_required() {
        let doc = GlskDocument {
            points: vec![point(0, 12, vec![]), point(6, 18, vec![])],
        };
        assert!(doc.point_for(&fr(), hour(3)).is_ok());
        let err = doc.point_for(&fr(), hour(8)).unwrap_err();
        assert!(err.to_string().contains("> 1 (2) glskPoints defined for country FR"));
        assert!(doc.point_for(&fr(), hour(20)).is_err());
    }

    #[test]
    fn keys_split_delta_between_generation_and_load() {
        let doc = GlskDocument {
            points: vec![point(
                0,
                24,
                vec![
                    key("G1", ShiftKeyKind::Generator, 0.5),
                    key("LD", ShiftKeyKind::Load, 0.5),
                ],
            )],
        };
        let mut network = network();
        let outcome = GlskRedispatch::new(doc, hour(10))
            .redispatch(&mut network, &fr(), Megawatts(20.0), &BTreeSet::new())
            .unwrap();
        assert_eq!(network.generator("G1").unwrap().target_p, Megawatts(110.0));
        assert_eq!(network.load("LD").unwrap().p0, Megawatts(190.0));
        assert_eq!(outcome.realized, Megawatts(20.0));
    }

    #[test]
    fn excluded_keys_are_renormalised_away() {
        let doc = GlskDocument {
            points: vec![point(
                0,
                24,
                vec![
                    key("G1", ShiftKeyKind::Generator, 0.5),
                    key("G2", ShiftKeyKind::Generator, 0.3),
                    key("G_MISSING", ShiftKeyKind::Generator, 0.2),
                ],
            )],
        };
        let mut network = network();
        let exclusions = BTreeSet::from(["G1".to_string()]);
        GlskRedispatch::new(doc, hour(10))
            .redispatch(&mut network, &fr(), Megawatts(30.0), &exclusions)
            .unwrap();
        assert_eq!(network.generator("G1").unwrap().target_p, Megawatts(100.0));
        assert!((network.generator("G2").unwrap().target_p.value() - 130.0).abs() < 1e-9);
    }

    #[test]
    fn document_loads_from_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "points:\n  - country: FR\n    start: 2024-01-10T00:00:00Z\n    end: 2024-01-11T00:00:00Z\n    shift_keys:\n      - {{resource_id: G1, kind: generator, factor: 1.0}}\n"
        )
        .unwrap();
        let doc = GlskDocument::from_path(file.path()).unwrap();
        assert_eq!(doc.countries().len(), 1);
        assert_eq!(doc.points[0].shift_keys[0].kind, ShiftKeyKind::Generator);
        let strategy = GlskRedispatch::new(doc, hour(5));
        assert!(strategy.covered_countries().contains(&fr()));
    }
}
