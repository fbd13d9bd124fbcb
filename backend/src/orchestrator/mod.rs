//! Orchestrator - configuration and the main step loop
//!
//! See `engine.rs` for the step loop and `config.rs` for the configuration
//! surface.

pub mod config;
pub mod engine;

pub use config::{ComponentConfig, ConfigError, PopulationConfig, SimulationConfig, TimeConfig};
pub use engine::{Simulation, SimulationError, StepResult, TrackTotals};
