//! Parameters of sweeper, level and step, readable from a TOML document such as
//!
//! ```toml
//! [sweeper]
//! num_nodes = 3
//! quad_type = "RADAU-RIGHT"
//! QI = "LU"
//! QE = "EE"
//! splitting = "imex"
//! initial_guess = "spread"
//!
//! [level]
//! dt = 1e-3
//! restol = 1e-8
//! nsweeps = 1
//!
//! [step]
//! maxiter = 50
//! ```
//!
//! Missing sections or keys keep their defaults.
use crate::numerical::SDC::SDC_collocation::QuadType;
use crate::numerical::SDC::SDC_errors::{SDCError, SDCResult};
use crate::numerical::SDC::SDC_preconditioners::QDeltaType;
use crate::numerical::SDC::SDC_sweeper::{InitialGuess, Splitting};
use log::{info, warn};
use std::fmt::Display;
use std::str::FromStr;
use toml::{Table, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct SweeperParams {
    pub num_nodes: usize,
    pub quad_type: QuadType,
    pub QI: QDeltaType,
    pub QE: QDeltaType,
    pub splitting: Splitting,
    pub initial_guess: InitialGuess,
}

impl Default for SweeperParams {
    fn default() -> Self {
        SweeperParams {
            num_nodes: 3,
            quad_type: QuadType::RadauRight,
            QI: QDeltaType::LU,
            QE: QDeltaType::ExplicitEuler,
            splitting: Splitting::FullyImplicit,
            initial_guess: InitialGuess::Spread,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelParams {
    pub dt: f64,
    /// residual tolerance ending the sweeps of a step
    pub restol: f64,
    /// sweeps per iteration, the residual is checked after each group
    pub nsweeps: usize,
}

impl Default for LevelParams {
    fn default() -> Self {
        LevelParams {
            dt: 0.1,
            restol: 1e-10,
            nsweeps: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepParams {
    /// maximum number of iterations per step, each one `nsweeps` sweeps
    pub maxiter: usize,
}

impl Default for StepParams {
    fn default() -> Self {
        StepParams { maxiter: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SDCConfig {
    pub sweeper: SweeperParams,
    pub level: LevelParams,
    pub step: StepParams,
}

impl Display for SDCConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SDCConfig {{ num_nodes: {}, quad_type: {}, QI: {}, QE: {}, splitting: {}, \
             initial_guess: {}, dt: {}, restol: {}, nsweeps: {}, maxiter: {} }}",
            self.sweeper.num_nodes,
            self.sweeper.quad_type,
            self.sweeper.QI,
            self.sweeper.QE,
            self.sweeper.splitting,
            self.sweeper.initial_guess,
            self.level.dt,
            self.level.restol,
            self.level.nsweeps,
            self.step.maxiter
        )
    }
}

impl SDCConfig {
    pub fn from_toml_str(input: &str) -> SDCResult<SDCConfig> {
        let document: Table = toml::from_str(input)
            .map_err(|e| SDCError::Config(format!("TOML parse error: {}", e)))?;
        let mut config = SDCConfig::default();

        for (name, value) in document.iter() {
            let section = value
                .as_table()
                .ok_or_else(|| SDCError::Config(format!("[{}] must be a table", name)))?;
            match name.as_str() {
                "sweeper" => config.sweeper.read(section)?,
                "level" => config.level.read(section)?,
                "step" => config.step.read(section)?,
                other => warn!("ignoring unknown config section [{}]", other),
            }
        }
        config.check()?;
        info!("loaded {}", config);
        Ok(config)
    }

    pub fn from_file(path: &str) -> SDCResult<SDCConfig> {
        let input = std::fs::read_to_string(path)
            .map_err(|e| SDCError::Config(format!("cannot read {}: {}", path, e)))?;
        Self::from_toml_str(&input)
    }

    pub fn check(&self) -> SDCResult<()> {
        if self.sweeper.num_nodes == 0 {
            return Err(SDCError::Config("num_nodes must be at least 1".to_string()));
        }
        if !(self.level.dt > 0.0) {
            return Err(SDCError::Config(format!(
                "dt must be greater than 0; got {}",
                self.level.dt
            )));
        }
        if !(self.level.restol >= 0.0) {
            return Err(SDCError::Config(format!(
                "restol must be non-negative; got {}",
                self.level.restol
            )));
        }
        if self.level.nsweeps == 0 {
            return Err(SDCError::Config("nsweeps must be greater than 0".to_string()));
        }
        if self.step.maxiter == 0 {
            return Err(SDCError::Config("maxiter must be greater than 0".to_string()));
        }
        if self.sweeper.splitting == Splitting::Imex && !self.sweeper.QE.is_explicit() {
            return Err(SDCError::Config(format!(
                "QE = {} is not an explicit preconditioner",
                self.sweeper.QE
            )));
        }
        Ok(())
    }
}

impl SweeperParams {
    fn read(&mut self, section: &Table) -> SDCResult<()> {
        for (key, value) in section.iter() {
            match key.as_str() {
                "num_nodes" => self.num_nodes = as_usize(key, value)?,
                "quad_type" => self.quad_type = as_enum(key, value)?,
                "QI" => self.QI = as_enum(key, value)?,
                "QE" => self.QE = as_enum(key, value)?,
                "splitting" => self.splitting = as_enum(key, value)?,
                "initial_guess" => self.initial_guess = as_enum(key, value)?,
                other => warn!("ignoring unknown sweeper parameter {}", other),
            }
        }
        Ok(())
    }
}

impl LevelParams {
    fn read(&mut self, section: &Table) -> SDCResult<()> {
        for (key, value) in section.iter() {
            match key.as_str() {
                "dt" => self.dt = as_f64(key, value)?,
                "restol" => self.restol = as_f64(key, value)?,
                "nsweeps" => self.nsweeps = as_usize(key, value)?,
                other => warn!("ignoring unknown level parameter {}", other),
            }
        }
        Ok(())
    }
}

impl StepParams {
    fn read(&mut self, section: &Table) -> SDCResult<()> {
        for (key, value) in section.iter() {
            match key.as_str() {
                "maxiter" => self.maxiter = as_usize(key, value)?,
                other => warn!("ignoring unknown step parameter {}", other),
            }
        }
        Ok(())
    }
}

fn as_usize(key: &str, value: &Value) -> SDCResult<usize> {
    value
        .as_integer()
        .and_then(|i| usize::try_from(i).ok())
        .ok_or_else(|| {
            SDCError::Config(format!(
                "{} must be a non-negative integer; got {}",
                key, value
            ))
        })
}

fn as_f64(key: &str, value: &Value) -> SDCResult<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
        .ok_or_else(|| SDCError::Config(format!("{} must be a number; got {}", key, value)))
}

fn as_enum<T: FromStr>(key: &str, value: &Value) -> SDCResult<T> {
    let name = value
        .as_str()
        .ok_or_else(|| SDCError::Config(format!("{} must be a string; got {}", key, value)))?;
    T::from_str(name).map_err(|_| SDCError::Config(format!("unknown value {:?} for {}", name, key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SDCConfig::default();
        assert_eq!(config.sweeper.num_nodes, 3);
        assert_eq!(config.sweeper.QI, QDeltaType::LU);
        assert_eq!(config.sweeper.splitting, Splitting::FullyImplicit);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_full_document() {
        let input = r#"
            [sweeper]
            num_nodes = 4
            quad_type = "GAUSS"
            QI = "IE"
            QE = "EE"
            splitting = "imex"
            initial_guess = "zero"

            [level]
            dt = 1e-3
            restol = 1e-8
            nsweeps = 3

            [step]
            maxiter = 50
        "#;
        let config = SDCConfig::from_toml_str(input).unwrap();
        assert_eq!(config.sweeper.num_nodes, 4);
        assert_eq!(config.sweeper.quad_type, QuadType::GaussLegendre);
        assert_eq!(config.sweeper.QI, QDeltaType::ImplicitEuler);
        assert_eq!(config.sweeper.splitting, Splitting::Imex);
        assert_eq!(config.sweeper.initial_guess, InitialGuess::Zero);
        assert_eq!(config.level.dt, 1e-3);
        assert_eq!(config.level.restol, 1e-8);
        assert_eq!(config.level.nsweeps, 3);
        assert_eq!(config.step.maxiter, 50);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = SDCConfig::from_toml_str("[level]\ndt = 1\n").unwrap();
        assert_eq!(config.level.dt, 1.0);
        assert_eq!(config.sweeper, SweeperParams::default());
        assert_eq!(config.level.nsweeps, 1);
        assert_eq!(config.step.maxiter, 20);
    }

    #[test]
    fn test_invalid_values() {
        assert!(SDCConfig::from_toml_str("[sweeper]\nQI = \"NOPE\"\n").is_err());
        assert!(SDCConfig::from_toml_str("[sweeper]\nnum_nodes = -1\n").is_err());
        assert!(SDCConfig::from_toml_str("[level]\ndt = 0.0\n").is_err());
        assert!(SDCConfig::from_toml_str("[step]\nmaxiter = 0\n").is_err());
        assert!(SDCConfig::from_toml_str("[level]\nnsweeps = 0\n").is_err());
        assert!(SDCConfig::from_toml_str("level = 3\n").is_err());
        let implicit_qe = "[sweeper]\nsplitting = \"imex\"\nQE = \"LU\"\n";
        assert!(SDCConfig::from_toml_str(implicit_qe).is_err());
        assert!(SDCConfig::from_toml_str("[sweeper\n").is_err());
    }
}
