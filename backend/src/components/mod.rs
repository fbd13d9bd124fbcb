//! Simulation Components
//!
//! Diseases and interventions plug into the simulation through the
//! [`Component`] trait. A component:
//! 1. registers base producers and modifiers during [`setup`](Component::setup)
//! 2. optionally seeds private state in [`initialize`](Component::initialize)
//! 3. optionally advances private state in [`prepare_step`](Component::prepare_step)
//! 4. contributes to pipelines in [`modify`](Component::modify), a pure read
//! 5. optionally writes observational bookkeeping in [`record_step`](Component::record_step)
//!
//! Components never mutate simulation state directly. Phases that write
//! return a [`StateUpdate`] which the engine applies, so every pipeline read
//! is free of side effects and may be audited in isolation.
//!
//! # Example
//!
//! ```rust
//! use mslt_core_rs::components::{Builder, Component, EvalContext, SetupError};
//! use mslt_core_rs::pipeline::{names, PipelineError};
//! use mslt_core_rs::CohortId;
//!
//! /// Adds a constant to the intervention mortality hazard
//! struct ExtraHazard(f64);
//!
//! impl Component for ExtraHazard {
//!     fn name(&self) -> &str {
//!         "extra_hazard"
//!     }
//!
//!     fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
//!         builder.register_modifier(names::MORTALITY_RATE);
//!         Ok(())
//!     }
//!
//!     fn modify(
//!         &self,
//!         _pipeline: &str,
//!         _cohort: CohortId,
//!         value: f64,
//!         _ctx: &EvalContext<'_>,
//!     ) -> Result<f64, PipelineError> {
//!         Ok(value + self.0)
//!     }
//! }
//! ```

pub mod acute;
pub mod chronic;
pub mod expenditure;
pub mod scale;
pub mod stage;
pub mod transition;

pub use acute::AcuteDisease;
pub use chronic::ChronicDisease;
pub use expenditure::Expenditure;
pub use scale::{MortalityEffects, ScaleModifier};
pub use stage::Lockdown;

use crate::core::time::SimulationClock;
use crate::lookup::{InputTables, LookupError, LookupTable};
use crate::models::cohort::{Cohort, CohortId};
use crate::models::state::{SimulationState, StateUpdate};
use crate::pipeline::{Modifier, PipelineError, PipelineKind, RateRegistry};
use std::sync::Arc;
use thiserror::Error;

/// Position of a component in the simulation's component list
pub type ComponentId = usize;

/// Errors raised while a component registers itself
#[derive(Debug, Error, PartialEq)]
pub enum SetupError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Invalid {measure} scale for {component}: {scale}")]
    InvalidScale {
        component: String,
        measure: String,
        scale: f64,
    },
}

/// A disease or intervention taking part in the simulation
pub trait Component {
    /// Unique component name
    fn name(&self) -> &str;

    /// Load tables and register producers and modifiers
    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError>;

    /// Seed private state before the first step
    fn initialize(&self, _state: &SimulationState, _clock: &SimulationClock) -> Option<StateUpdate> {
        None
    }

    /// Advance private state, after cohorts age and before pipelines are read
    fn prepare_step(&self, _ctx: &EvalContext<'_>) -> Result<Option<StateUpdate>, PipelineError> {
        Ok(None)
    }

    /// Contribute to a pipeline this component registered a modifier on
    ///
    /// Must not depend on anything written later in the same step.
    fn modify(
        &self,
        _pipeline: &str,
        _cohort: CohortId,
        value: f64,
        _ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        Ok(value)
    }

    /// Write observational bookkeeping after populations are updated
    fn record_step(&self, _ctx: &EvalContext<'_>) -> Result<Option<StateUpdate>, PipelineError> {
        Ok(None)
    }
}

/// Setup-time handle given to one component
///
/// Modifiers registered through a builder dispatch back to the component
/// the builder was created for.
pub struct Builder<'a> {
    registry: &'a mut RateRegistry,
    tables: &'a InputTables,
    component_id: ComponentId,
}

impl<'a> Builder<'a> {
    pub fn new(
        registry: &'a mut RateRegistry,
        tables: &'a InputTables,
        component_id: ComponentId,
    ) -> Self {
        Self {
            registry,
            tables,
            component_id,
        }
    }

    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Load an input table by key
    pub fn load(&self, key: &str) -> Result<Arc<dyn LookupTable>, SetupError> {
        Ok(self.tables.get(key)?)
    }

    /// Register a hazard pipeline whose annual values are rescaled per step
    pub fn register_rate_producer(
        &mut self,
        name: &str,
        table: Arc<dyn LookupTable>,
    ) -> Result<(), SetupError> {
        log::debug!("component {} registers rate producer {}", self.component_id, name);
        Ok(self
            .registry
            .register_shared_base(name, PipelineKind::Rate, table)?)
    }

    /// Register a pipeline whose values are used unscaled
    pub fn register_value_producer(
        &mut self,
        name: &str,
        table: Arc<dyn LookupTable>,
    ) -> Result<(), SetupError> {
        log::debug!("component {} registers value producer {}", self.component_id, name);
        Ok(self
            .registry
            .register_shared_base(name, PipelineKind::Value, table)?)
    }

    /// Append this component to a pipeline's modifier list
    pub fn register_modifier(&mut self, name: &str) {
        log::debug!("component {} modifies {}", self.component_id, name);
        self.registry
            .register_modifier(name, Modifier::Component(self.component_id));
    }
}

/// Read-only view handed to components while pipelines are evaluated
pub struct EvalContext<'a> {
    pub registry: &'a RateRegistry,
    pub components: &'a [Box<dyn Component>],
    pub state: &'a SimulationState,
    pub clock: &'a SimulationClock,
}

impl<'a> EvalContext<'a> {
    /// Evaluate a pipeline for one cohort
    pub fn rate(&self, pipeline: &str, cohort: CohortId) -> Result<f64, PipelineError> {
        self.registry.evaluate(pipeline, cohort, self)
    }

    pub fn cohort(&self, id: CohortId) -> Result<&'a Cohort, PipelineError> {
        self.state
            .cohort(id)
            .ok_or(PipelineError::UnknownCohort(id))
    }

    /// Year used to index lookup tables
    pub fn year(&self) -> i32 {
        self.clock.current_year()
    }

    pub fn years_per_step(&self) -> f64 {
        self.clock.years_per_step()
    }
}
