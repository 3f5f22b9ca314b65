//! Run parameters, loadable from JSON or YAML.

use angmon_core::{AngmonError, AngmonResult, Country, LoadFlowParameters};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringParameters {
    /// Number of network clones worked on concurrently; 0 means one per CPU.
    pub parallelism: usize,
    pub load_flow: LoadFlowParameters,
    pub redispatch: RedispatchParameters,
}

impl Default for MonitoringParameters {
    fn default() -> Self {
        Self {
            parallelism: 0,
            load_flow: LoadFlowParameters::default(),
            redispatch: RedispatchParameters::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedispatchParameters {
    /// Weight floor for generators at zero output in automatic redispatch (MW).
    pub epsilon_mw: f64,
    /// Allowed gap between requested and realized redispatch before warning (MW).
    pub tolerance_mw: f64,
    /// Reallocation rounds once generators hit their limits.
    pub max_iterations: usize,
    /// Countries automatic redispatch may act in.
    pub countries: BTreeSet<Country>,
}

impl Default for RedispatchParameters {
    fn default() -> Self {
        Self {
            epsilon_mw: 1e-3,
            tolerance_mw: 1.0,
            max_iterations: 20,
            countries: BTreeSet::new(),
        }
    }
}

impl MonitoringParameters {
    /// Read parameters from a `.json`, `.yaml` or `.yml` file; other extensions try YAML then JSON.
    pub fn from_path(path: &Path) -> AngmonResult<Self> {
        let data = fs::read_to_string(path)?;
        let parsed: Result<Self, anyhow::Error> = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                serde_yaml::from_str(&data).context("parsing monitoring parameters yaml")
            }
            Some(ext) if ext.eq_ignore_ascii_case("json") => {
                serde_json::from_str(&data).context("parsing monitoring parameters json")
            }
            _ => serde_yaml::from_str(&data)
                .or_else(|_| serde_json::from_str(&data))
                .context("parsing monitoring parameters"),
        };
        let parsed = parsed.map_err(|e| AngmonError::Parse(format!("{e:#}")))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> AngmonResult<()> {
        let lf = &self.load_flow;
        if !(lf.base_mva.is_finite() && lf.base_mva > 0.0) {
            return Err(AngmonError::Config(format!(
                "load_flow.base_mva must be positive, got {}",
                lf.base_mva
            )));
        }
        if !(lf.min_reactance_pu.is_finite() && lf.min_reactance_pu > 0.0) {
            return Err(AngmonError::Config(format!(
                "load_flow.min_reactance_pu must be positive, got {}",
                lf.min_reactance_pu
            )));
        }
        let rd = &self.redispatch;
        if !(rd.epsilon_mw.is_finite() && rd.epsilon_mw > 0.0) {
            return Err(AngmonError::Config(format!(
                "redispatch.epsilon_mw must be positive, got {}",
                rd.epsilon_mw
            )));
        }
        if !(rd.tolerance_mw.is_finite() && rd.tolerance_mw >= 0.0) {
            return Err(AngmonError::Config(format!(
                "redispatch.tolerance_mw must be non-negative, got {}",
                rd.tolerance_mw
            )));
        }
        if rd.max_iterations == 0 {
            return Err(AngmonError::Config(
                "redispatch.max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn effective_parallelism(&self) -> usize {
        if self.parallelism == 0 {
            num_cpus::get().max(1)
        } else {
            self.parallelism
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use angmon_core::SolverKind;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let params = MonitoringParameters::default();
        params.validate().unwrap();
        assert!(params.effective_parallelism() >= 1);
        assert_eq!(params.redispatch.tolerance_mw, 1.0);
    }

    #[test]
    fn loads_yaml_with_partial_fields() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "parallelism: 3\nload_flow:\n  backend: faer\nredispatch:\n  countries: [fr, BE]\n"
        )
        .unwrap();
        let params = MonitoringParameters::from_path(file.path()).unwrap();
        assert_eq!(params.parallelism, 3);
        assert_eq!(params.load_flow.backend, SolverKind::Faer);
        assert_eq!(params.load_flow.base_mva, 100.0);
        let codes: Vec<&str> = params.redispatch.countries.iter().map(|c| c.code()).collect();
        assert_eq!(codes, ["BE", "FR"]);
    }

    #[test]
    fn loads_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"redispatch": {{"tolerance_mw": 0.5}}}}"#).unwrap();
        let params = MonitoringParameters::from_path(file.path()).unwrap();
        assert_eq!(params.redispatch.tolerance_mw, 0.5);
        assert_eq!(params.redispatch.max_iterations, 20);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"redispatch": {{"max_iterations": 0}}}}"#).unwrap();
        let err = MonitoringParameters::from_path(file.path()).unwrap_err();
        assert!(err.is_configuration());

        let mut params = MonitoringParameters::default();
        params.load_flow.base_mva = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn bad_country_code_fails_parsing() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "redispatch:\n  countries: [FRA]").unwrap();
        assert!(MonitoringParameters::from_path(file.path()).is_err());
    }
}
