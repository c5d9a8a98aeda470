//! Solver settings.
//!
//! Settings can be given in code through [`HelmSolver`](super::HelmSolver)
//! builder methods or loaded from TOML. Partial files are accepted; absent
//! keys keep their defaults.
//!
//! ```toml
//! max_coefficients = 41
//! tolerance = 1e-8
//! acceleration = "epsilon"
//! formulation = "admittance"
//! precision = "double"
//! linear_solver = "gauss"
//! stability_analysis = true
//! ```

use std::path::Path;

use gat_core::SolverKind;
use serde::{Deserialize, Serialize};

use super::precision::Precision;
use crate::error::{HelmError, HelmResult};

/// Largest accepted `max_coefficients`. Double-precision series leave the
/// finite range long before this order.
pub const MAX_COEFFICIENT_LIMIT: usize = 1000;

/// Series acceleration applied to every bus voltage series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Acceleration {
    /// Diagonal Padé approximants, refreshed at even orders
    #[default]
    Pade,
    /// Wynn's epsilon algorithm, refreshed at every order
    Epsilon,
}

/// Which embedding produces the coefficient series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formulation {
    /// Dense `Zred` product per order
    #[default]
    Impedance,
    /// Expanded real system with PV reactive power unknowns
    Admittance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelmConfig {
    /// Highest coefficient order computed (orders `0..=max_coefficients`).
    pub max_coefficients: usize,

    /// Power mismatch (infinity norm, p.u.) below which the solve converges.
    pub tolerance: f64,

    pub acceleration: Acceleration,

    pub formulation: Formulation,

    pub precision: Precision,

    /// Dense backend for the reduced-matrix factorization and Padé systems.
    pub linear_solver: SolverKind,

    /// Keep one history record per completed order.
    pub record_history: bool,

    /// Compute sigma and nose-point indicators once the loop stops.
    pub stability_analysis: bool,
}

impl Default for HelmConfig {
    fn default() -> Self {
        Self {
            max_coefficients: 30,
            tolerance: 1e-3,
            acceleration: Acceleration::default(),
            formulation: Formulation::default(),
            precision: Precision::default(),
            linear_solver: SolverKind::default(),
            record_history: true,
            stability_analysis: false,
        }
    }
}

impl HelmConfig {
    pub fn from_toml_str(contents: &str) -> HelmResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> HelmResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn to_toml_string(&self) -> HelmResult<String> {
        toml::to_string_pretty(self).map_err(|e| HelmError::Config(e.to_string()))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> HelmResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Reject settings no solve can honour.
    pub fn validate(&self) -> HelmResult<()> {
        if self.max_coefficients > MAX_COEFFICIENT_LIMIT {
            return Err(HelmError::Config(format!(
                "max_coefficients must be at most {}, got {}",
                MAX_COEFFICIENT_LIMIT, self.max_coefficients
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(HelmError::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = HelmConfig::default();
        assert_eq!(config.max_coefficients, 30);
        assert_eq!(config.tolerance, 1e-3);
        assert_eq!(config.acceleration, Acceleration::Pade);
        assert_eq!(config.formulation, Formulation::Impedance);
        assert_eq!(config.precision, Precision::Double);
        assert_eq!(config.linear_solver, SolverKind::Faer);
        assert!(config.record_history);
        assert!(!config.stability_analysis);
    }

    #[test]
    fn test_partial_config_parsing() {
        let toml = r#"
            max_coefficients = 41
            acceleration = "epsilon"
            linear_solver = "gauss"
        "#;
        let config = HelmConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.max_coefficients, 41);
        assert_eq!(config.acceleration, Acceleration::Epsilon);
        assert_eq!(config.linear_solver, SolverKind::Gauss);
        // Defaults for unset values
        assert_eq!(config.tolerance, 1e-3);
        assert_eq!(config.formulation, Formulation::Impedance);
    }

    #[test]
    fn test_unknown_variant_is_config_error() {
        let err = HelmConfig::from_toml_str("acceleration = \"richardson\"").unwrap_err();
        assert!(matches!(err, HelmError::Config(_)));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let err = HelmConfig::from_toml_str("tolerance = -1.0").unwrap_err();
        assert!(err.to_string().contains("tolerance"));
    }

    #[test]
    fn test_max_coefficients_bounded() {
        let err = HelmConfig::from_toml_str("max_coefficients = 1000000000000").unwrap_err();
        assert!(matches!(err, HelmError::Config(_)));
        assert!(err.to_string().contains("max_coefficients"));

        let config = HelmConfig::from_toml_str("max_coefficients = 1000").unwrap();
        assert_eq!(config.max_coefficients, MAX_COEFFICIENT_LIMIT);
    }

    #[test]
    fn test_save_and_load() {
        let file = NamedTempFile::new().unwrap();
        let mut config = HelmConfig::default();
        config.formulation = Formulation::Admittance;
        config.precision = Precision::Single;
        config.stability_analysis = true;
        config.save_to(file.path()).unwrap();

        let loaded = HelmConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = HelmConfig::from_toml_file("/nonexistent/helm.toml").unwrap_err();
        assert!(matches!(err, HelmError::Io(_)));
    }
}
