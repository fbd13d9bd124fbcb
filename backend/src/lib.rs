//! Multi-State Life Table Core - Rust Engine
//!
//! Deterministic cohort simulation projecting population, deaths and
//! health-adjusted life years under a business-as-usual (BAU) track and an
//! intervention track at once.
//!
//! # Architecture
//!
//! - **core**: Time management
//! - **lookup**: `(age, sex, year) → value` input tables
//! - **models**: Domain types (Cohort, disease state, events)
//! - **pipeline**: Named rate pipelines with ordered modifiers
//! - **components**: Chronic and acute diseases, intervention scalers
//! - **population**: Mortality, person-years and HALY arithmetic
//! - **orchestrator**: Configuration and the main step loop
//!
//! # Critical Invariants
//!
//! 1. BAU columns evolve under unmodified base rates; intervention columns
//!    include every registered modifier
//! 2. Each aggregate pipeline is evaluated at most once per cohort per step
//! 3. Modifiers are applied in registration order
//! 4. No global state: the pipeline registry is owned by the simulation

// Module declarations
pub mod components;
pub mod core;
pub mod lookup;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod population;

// Re-exports for convenience
pub use components::{Component, ComponentId, SetupError};
pub use crate::core::time::SimulationClock;
pub use lookup::{InputTables, LookupError, LookupTable};
pub use models::{
    cohort::{Cohort, CohortId, Sex, Track, TrackState},
    event::{Event, EventLog},
    state::SimulationState,
};
pub use orchestrator::{
    ComponentConfig, ConfigError, Simulation, SimulationConfig, SimulationError, StepResult,
};
pub use pipeline::{PipelineError, RateRegistry};
