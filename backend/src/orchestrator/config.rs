//! Simulation configuration
//!
//! Everything needed to build a [`Simulation`](super::Simulation) apart from
//! the input tables: population size, time span and the ordered list of
//! components. The order of `components` is the order in which their
//! modifiers are registered, and therefore applied.
//!
//! # Example
//!
//! ```rust
//! use mslt_core_rs::orchestrator::{ComponentConfig, SimulationConfig};
//!
//! let config = SimulationConfig::from_json(r#"{
//!     "population": { "population_size": 2 },
//!     "time": { "start": "2011-01-01", "end": "2013-01-01", "step_size": 365 },
//!     "components": [
//!         { "type": "chronic_disease", "name": "chd" },
//!         { "type": "incidence_shift", "disease": "chd", "rate_reduce": 0.2 }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(config.population.max_age, 110.0);
//! assert!(config.validate().is_ok());
//! assert!(matches!(config.components[0], ComponentConfig::ChronicDisease { .. }));
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors found while loading or validating a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("population_size must be > 0")]
    EmptyPopulation,

    #[error("max_age must be positive and finite, got {0}")]
    InvalidMaxAge(f64),

    #[error("step_size must be > 0 days")]
    ZeroStepSize,

    #[error("end date {end} must be after start date {start}")]
    EmptyPeriod { start: NaiveDate, end: NaiveDate },

    #[error("Invalid {measure} scale for {component}: {scale}")]
    InvalidScale {
        component: String,
        measure: String,
        scale: f64,
    },

    #[error("Duplicate component: {0}")]
    DuplicateComponent(String),

    #[error("{component} refers to {disease}, which is not a configured {kind} disease")]
    UnknownDisease {
        component: String,
        disease: String,
        kind: &'static str,
    },
}

fn default_max_age() -> f64 {
    110.0
}

/// Population structure settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of (age, sex) cohorts in the population table
    pub population_size: usize,

    /// Cohorts older than this leave the active set
    #[serde(default = "default_max_age")]
    pub max_age: f64,
}

/// Simulation period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Step length in days
    pub step_size: u32,
}

/// Component selection
///
/// Each variant maps to one concrete component type when the simulation is
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentConfig {
    /// Chronic disease with Susceptible/Case compartments
    ChronicDisease {
        name: String,
        /// Use the simplified equations when remission is zero everywhere
        #[serde(default)]
        simplified_no_remission_equations: bool,
    },

    /// Acute disease contributing rates directly
    AcuteDisease {
        name: String,
        /// Table key, defaults to `name`
        #[serde(default)]
        data_name: Option<String>,
        /// Model the disease on the intervention track only
        #[serde(default)]
        no_bau: bool,
    },

    /// Table-driven multiplier on intervention all-cause mortality
    MortalityEffects { name: String },

    /// Stage-dependent scaling of acute disease rates
    Lockdown {
        data_name: String,
        /// Full-stage scale of each disease's excess mortality
        #[serde(default)]
        mortality: BTreeMap<String, f64>,
        /// Full-stage scale of each disease's disability rate
        #[serde(default)]
        morbidity: BTreeMap<String, f64>,
    },

    /// Halve intervention all-cause mortality
    MortalityShift,

    /// Halve the intervention disability rate
    YldShift,

    /// Reduce a chronic disease's intervention incidence
    IncidenceShift {
        disease: String,
        #[serde(default)]
        rate_reduce: Option<f64>,
    },

    /// Scale an acute disease's intervention excess mortality
    AcuteMortalityScale { disease: String, scale: f64 },

    /// Scale an acute disease's intervention disability rate
    AcuteYldScale { disease: String, scale: f64 },

    /// Per-cohort health expenditure
    Expenditure,
}

impl ComponentConfig {
    /// Name of the component this entry builds
    pub fn name(&self) -> String {
        match self {
            ComponentConfig::ChronicDisease { name, .. }
            | ComponentConfig::AcuteDisease { name, .. } => name.clone(),
            ComponentConfig::MortalityEffects { name } => format!("{}_mort_effects", name),
            ComponentConfig::Lockdown { .. } => "lockdown".to_string(),
            ComponentConfig::MortalityShift => "mortality_shift".to_string(),
            ComponentConfig::YldShift => "yld_shift".to_string(),
            ComponentConfig::IncidenceShift { disease, .. } => {
                format!("{}_incidence_shift", disease)
            }
            ComponentConfig::AcuteMortalityScale { disease, .. } => {
                format!("{}_mortality_scale", disease)
            }
            ComponentConfig::AcuteYldScale { disease, .. } => format!("{}_yld_scale", disease),
            ComponentConfig::Expenditure => "expenditure".to_string(),
        }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub population: PopulationConfig,
    pub time: TimeConfig,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

fn check_scale(component: &str, measure: &str, scale: f64) -> Result<(), ConfigError> {
    if scale >= 0.0 && scale.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidScale {
            component: component.to_string(),
            measure: measure.to_string(),
            scale,
        })
    }
}

impl SimulationConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every rule that can be decided without input tables
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        let max_age = self.population.max_age;
        if !(max_age > 0.0) || !max_age.is_finite() {
            return Err(ConfigError::InvalidMaxAge(max_age));
        }
        if self.time.step_size == 0 {
            return Err(ConfigError::ZeroStepSize);
        }
        if self.time.end <= self.time.start {
            return Err(ConfigError::EmptyPeriod {
                start: self.time.start,
                end: self.time.end,
            });
        }

        let mut names = HashSet::new();
        let mut chronic = HashSet::new();
        let mut acute = HashSet::new();
        for component in &self.components {
            let name = component.name();
            if !names.insert(name.clone()) {
                return Err(ConfigError::DuplicateComponent(name));
            }
            match component {
                ComponentConfig::ChronicDisease { name, .. } => {
                    chronic.insert(name.as_str());
                }
                ComponentConfig::AcuteDisease { name, .. } => {
                    acute.insert(name.as_str());
                }
                _ => {}
            }
        }

        for component in &self.components {
            let name = component.name();
            match component {
                ComponentConfig::Lockdown {
                    mortality,
                    morbidity,
                    ..
                } => {
                    for (measure, scales) in [("mortality", mortality), ("morbidity", morbidity)] {
                        for (disease, &scale) in scales {
                            check_scale(&format!("{}:{}", name, disease), measure, scale)?;
                            Self::require(&acute, &name, disease, "acute")?;
                        }
                    }
                }
                ComponentConfig::IncidenceShift {
                    disease,
                    rate_reduce,
                } => {
                    if let Some(reduce) = rate_reduce {
                        check_scale(&name, "incidence", 1.0 - reduce)?;
                    }
                    Self::require(&chronic, &name, disease, "chronic")?;
                }
                ComponentConfig::AcuteMortalityScale { disease, scale } => {
                    check_scale(&name, "mortality", *scale)?;
                    Self::require(&acute, &name, disease, "acute")?;
                }
                ComponentConfig::AcuteYldScale { disease, scale } => {
                    check_scale(&name, "YLD", *scale)?;
                    Self::require(&acute, &name, disease, "acute")?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn require(
        known: &HashSet<&str>,
        component: &str,
        disease: &str,
        kind: &'static str,
    ) -> Result<(), ConfigError> {
        if known.contains(disease) {
            Ok(())
        } else {
            Err(ConfigError::UnknownDisease {
                component: component.to_string(),
                disease: disease.to_string(),
                kind,
            })
        }
    }
}
