//! Simulation Engine
//!
//! Main step loop tying the components, pipelines and cohort state together.
//!
//! # Architecture
//!
//! ```text
//! For each step t:
//! 1. Age cohorts (not on the first step) and retire those past max_age
//! 2. Let components advance private state (chronic compartments)
//! 3. Evaluate mortality_rate, bau_mortality_rate, yld_rate and bau_yld_rate
//!    exactly once per tracked cohort
//! 4. Update population, deaths, person-years and HALYs on both tracks
//! 5. Let components record observational bookkeeping
//! 6. Log events and advance time
//! ```
//!
//! # Example
//!
//! ```rust
//! use mslt_core_rs::lookup::{ConstantTable, InputTables, PopulationRow};
//! use mslt_core_rs::orchestrator::{Simulation, SimulationConfig};
//! use mslt_core_rs::Sex;
//!
//! let config = SimulationConfig::from_json(r#"{
//!     "population": { "population_size": 1 },
//!     "time": { "start": "2011-01-01", "end": "2012-12-31", "step_size": 365 }
//! }"#).unwrap();
//!
//! let mut tables = InputTables::new();
//! tables.insert("cause.all_causes.mortality", ConstantTable::new(0.01).unwrap());
//! tables.insert("cause.all_causes.disability_rate", ConstantTable::new(0.1).unwrap());
//! tables.set_population(vec![PopulationRow { age: 52.0, sex: Sex::Female, population: 1_000.0 }]);
//!
//! let mut sim = Simulation::new(&config, &tables).unwrap();
//! let results = sim.run().unwrap();
//!
//! assert_eq!(results.len(), 2);
//! assert_eq!(results[0].haly_gain(), 0.0);
//! ```

use crate::components::{
    AcuteDisease, Builder, ChronicDisease, Component, EvalContext, Expenditure, Lockdown,
    MortalityEffects, ScaleModifier, SetupError,
};
use crate::core::time::SimulationClock;
use crate::lookup::{InputTables, LookupError};
use crate::models::cohort::{Cohort, CohortId, TrackState};
use crate::models::event::{Event, EventLog};
use crate::models::state::{SimulationState, StateUpdate};
use crate::orchestrator::config::{ComponentConfig, ConfigError, SimulationConfig};
use crate::pipeline::{names, EvaluationGuard, PipelineError, PipelineKind, RateRegistry};
use crate::population::{age_and_retire, update_track};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Table providing the all-cause mortality hazard of both tracks
pub const ALL_CAUSE_MORTALITY: &str = "cause.all_causes.mortality";
/// Table providing the all-cause disability rate of both tracks
pub const ALL_CAUSE_DISABILITY: &str = "cause.all_causes.disability_rate";

// ============================================================================
// Errors and results
// ============================================================================

/// Simulation error types
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Population table has {found} rows, expected {expected}")]
    PopulationMismatch { expected: usize, found: usize },

    #[error("Simulation already finished after {0} steps")]
    Finished(usize),
}

/// Sums over the tracked cohorts of one track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTotals {
    pub population: f64,
    pub deaths: f64,
    pub person_years: f64,
    pub haly: f64,
    pub expenditure: f64,
}

impl TrackTotals {
    fn add(&mut self, track: &TrackState) {
        self.population += track.population;
        self.deaths += track.deaths;
        self.person_years += track.person_years;
        self.haly += track.haly;
        self.expenditure += track.expenditure;
    }
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step number
    pub step: usize,

    /// Date at the start of the step
    pub date: NaiveDate,

    /// Year used for table lookups during the step
    pub year: i32,

    /// Cohorts updated during the step
    pub tracked_cohorts: usize,

    pub bau: TrackTotals,
    pub intervention: TrackTotals,
}

impl StepResult {
    /// HALYs gained by the intervention this step
    pub fn haly_gain(&self) -> f64 {
        self.intervention.haly - self.bau.haly
    }

    /// Deaths averted by the intervention this step
    pub fn deaths_averted(&self) -> f64 {
        self.bau.deaths - self.intervention.deaths
    }
}

/// Aggregate pipeline values for one cohort and step
#[derive(Debug, Clone, Copy)]
struct AggregateRates {
    mortality: f64,
    bau_mortality: f64,
    yld: f64,
    bau_yld: f64,
}

// ============================================================================
// Simulation
// ============================================================================

/// Main simulation managing cohort state and the step loop
///
/// Owns the pipeline registry; components receive it at setup and read it
/// through an [`EvalContext`] afterwards. There is no global state, so
/// several simulations may coexist.
pub struct Simulation {
    /// Time management
    clock: SimulationClock,

    /// Cohorts and per-disease state
    state: SimulationState,

    /// Every named pipeline
    registry: RateRegistry,

    /// Components in registration order
    components: Vec<Box<dyn Component>>,

    /// Single-evaluation check for the aggregate pipelines
    guard: EvaluationGuard,

    /// Event log (all simulation events)
    event_log: EventLog,

    /// Cohorts older than this are retired
    max_age: f64,
}

impl Simulation {
    /// Build a simulation from configuration and input tables
    pub fn new(config: &SimulationConfig, tables: &InputTables) -> Result<Self, SimulationError> {
        Self::with_components(config, tables, Vec::new())
    }

    /// Build a simulation with additional components
    ///
    /// `extra` components are set up after the configured ones, so their
    /// modifiers run last.
    pub fn with_components(
        config: &SimulationConfig,
        tables: &InputTables,
        extra: Vec<Box<dyn Component>>,
    ) -> Result<Self, SimulationError> {
        config.validate()?;

        let mut registry = RateRegistry::new();
        let mortality = tables.get(ALL_CAUSE_MORTALITY)?;
        registry.register_shared_base(names::MORTALITY_RATE, PipelineKind::Rate, mortality.clone())?;
        registry.register_shared_base(names::BAU_MORTALITY_RATE, PipelineKind::Rate, mortality)?;
        let disability = tables.get(ALL_CAUSE_DISABILITY)?;
        registry.register_shared_base(names::YLD_RATE, PipelineKind::Value, disability.clone())?;
        registry.register_shared_base(names::BAU_YLD_RATE, PipelineKind::Value, disability)?;

        let mut components: Vec<Box<dyn Component>> =
            config.components.iter().map(build_component).collect();
        components.extend(extra);

        for (id, component) in components.iter_mut().enumerate() {
            let mut builder = Builder::new(&mut registry, tables, id);
            component.setup(&mut builder)?;
        }
        registry.validate()?;

        let rows = tables.population();
        if rows.len() != config.population.population_size {
            return Err(SimulationError::PopulationMismatch {
                expected: config.population.population_size,
                found: rows.len(),
            });
        }
        let cohorts = rows
            .iter()
            .enumerate()
            .map(|(id, row)| Cohort::new(id, row.age, row.sex, row.population))
            .collect();
        let mut state = SimulationState::new(cohorts);

        let clock = SimulationClock::new(config.time.start, config.time.end, config.time.step_size);

        for component in &components {
            if let Some(update) = component.initialize(&state, &clock) {
                state.apply(update);
            }
        }

        let mut event_log = EventLog::new();
        event_log.log(Event::SimulationInitialized {
            step: 0,
            num_cohorts: state.num_cohorts(),
            components: components.iter().map(|c| c.name().to_string()).collect(),
        });
        log::info!(
            "initialized {} cohorts with {} components, {} steps of {} days",
            state.num_cohorts(),
            components.len(),
            clock.total_steps(),
            clock.step_days()
        );

        Ok(Self {
            clock,
            state,
            registry,
            components,
            guard: EvaluationGuard::new(),
            event_log,
            max_age: config.population.max_age,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn registry(&self) -> &RateRegistry {
        &self.registry
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn current_step(&self) -> usize {
        self.clock.current_step()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    /// Component names in registration order
    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Read-only view used for every pipeline evaluation
    pub fn context(&self) -> EvalContext<'_> {
        EvalContext {
            registry: &self.registry,
            components: &self.components,
            state: &self.state,
            clock: &self.clock,
        }
    }

    // ========================================================================
    // Step loop
    // ========================================================================

    /// Run every remaining step
    pub fn run(&mut self) -> Result<Vec<StepResult>, SimulationError> {
        let mut results = Vec::with_capacity(self.clock.total_steps());
        while !self.clock.is_finished() {
            results.push(self.step()?);
        }
        log::info!("simulation finished after {} steps", self.clock.current_step());
        Ok(results)
    }

    /// Execute one step
    pub fn step(&mut self) -> Result<StepResult, SimulationError> {
        if self.clock.is_finished() {
            return Err(SimulationError::Finished(self.clock.current_step()));
        }
        let step = self.clock.current_step();
        self.guard.begin_step(step);

        // 1. Age and retire; the loaded ages describe the first step
        let increment = if self.clock.is_first_step() {
            0.0
        } else {
            self.clock.years_per_step()
        };
        for id in age_and_retire(self.state.cohorts_mut(), increment, self.max_age) {
            let age = self.state.cohort(id).map_or(f64::NAN, |c| c.age);
            log::debug!("cohort {} retired at age {}", id, age);
            self.event_log.log(Event::CohortRetired {
                step,
                cohort_id: id,
                age,
            });
        }

        // 2. Advance private component state
        for index in 0..self.components.len() {
            let update = self.components[index].prepare_step(&self.context())?;
            if let Some(update) = update {
                if let StateUpdate::Chronic { disease, states } = &update {
                    self.event_log.log(Event::DiseaseStateAdvanced {
                        step,
                        disease: disease.clone(),
                        num_cohorts: states.len(),
                    });
                }
                self.state.apply(update);
            }
        }

        // 3. Read the aggregate pipelines once per cohort
        let tracked = self.state.tracked_ids();
        let mut rates = Vec::with_capacity(tracked.len());
        {
            let ctx = EvalContext {
                registry: &self.registry,
                components: &self.components,
                state: &self.state,
                clock: &self.clock,
            };
            for &id in &tracked {
                rates.push(AggregateRates {
                    mortality: read_once(&mut self.guard, &ctx, names::MORTALITY_RATE, id)?,
                    bau_mortality: read_once(&mut self.guard, &ctx, names::BAU_MORTALITY_RATE, id)?,
                    yld: read_once(&mut self.guard, &ctx, names::YLD_RATE, id)?,
                    bau_yld: read_once(&mut self.guard, &ctx, names::BAU_YLD_RATE, id)?,
                });
            }
        }

        // 4. Update both tracks
        let years_per_step = self.clock.years_per_step();
        for (&id, rates) in tracked.iter().zip(&rates) {
            let cohort = self
                .state
                .cohort_mut(id)
                .ok_or(PipelineError::UnknownCohort(id))?;
            update_track(&mut cohort.bau, rates.bau_mortality, rates.bau_yld, years_per_step);
            update_track(&mut cohort.intervention, rates.mortality, rates.yld, years_per_step);
        }

        // 5. Observational bookkeeping
        for index in 0..self.components.len() {
            if let Some(update) = self.components[index].record_step(&self.context())? {
                self.state.apply(update);
            }
        }

        // 6. Summarize, log, advance
        let result = self.summarize(step, &tracked);
        self.event_log.log(Event::StepCompleted {
            step,
            date: result.date,
            tracked_cohorts: result.tracked_cohorts,
            deaths: result.intervention.deaths,
            bau_deaths: result.bau.deaths,
        });
        log::debug!(
            "step {} ({}): {} cohorts, HALY gain {}",
            step,
            result.date,
            result.tracked_cohorts,
            result.haly_gain()
        );

        self.clock.advance_step();
        Ok(result)
    }

    fn summarize(&self, step: usize, tracked: &[CohortId]) -> StepResult {
        let mut bau = TrackTotals::default();
        let mut intervention = TrackTotals::default();
        for cohort in tracked.iter().filter_map(|&id| self.state.cohort(id)) {
            bau.add(&cohort.bau);
            intervention.add(&cohort.intervention);
        }
        StepResult {
            step,
            date: self.clock.current_date(),
            year: self.clock.current_year(),
            tracked_cohorts: tracked.len(),
            bau,
            intervention,
        }
    }
}

/// Claim and evaluate an aggregate pipeline for one cohort
fn read_once(
    guard: &mut EvaluationGuard,
    ctx: &EvalContext<'_>,
    pipeline: &'static str,
    cohort: CohortId,
) -> Result<f64, PipelineError> {
    guard.claim(pipeline, cohort)?;
    ctx.rate(pipeline, cohort)
}

/// Create the component described by one configuration entry
fn build_component(config: &ComponentConfig) -> Box<dyn Component> {
    match config {
        ComponentConfig::ChronicDisease {
            name,
            simplified_no_remission_equations,
        } => Box::new(
            ChronicDisease::new(name.as_str())
                .with_simplified_no_remission_equations(*simplified_no_remission_equations),
        ),
        ComponentConfig::AcuteDisease {
            name,
            data_name,
            no_bau,
        } => {
            let disease = AcuteDisease::new(name.as_str()).with_no_bau(*no_bau);
            match data_name {
                Some(data_name) => Box::new(disease.with_data_name(data_name.as_str())),
                None => Box::new(disease),
            }
        }
        ComponentConfig::MortalityEffects { name } => {
            Box::new(MortalityEffects::new(name.as_str()))
        }
        ComponentConfig::Lockdown {
            data_name,
            mortality,
            morbidity,
        } => Box::new(Lockdown::new(
            data_name.as_str(),
            mortality.clone(),
            morbidity.clone(),
        )),
        ComponentConfig::MortalityShift => Box::new(ScaleModifier::mortality_shift()),
        ComponentConfig::YldShift => Box::new(ScaleModifier::yld_shift()),
        ComponentConfig::IncidenceShift {
            disease,
            rate_reduce,
        } => Box::new(ScaleModifier::incidence_shift(disease, *rate_reduce)),
        ComponentConfig::AcuteMortalityScale { disease, scale } => {
            Box::new(ScaleModifier::acute_mortality(disease, *scale))
        }
        ComponentConfig::AcuteYldScale { disease, scale } => {
            Box::new(ScaleModifier::acute_yld(disease, *scale))
        }
        ComponentConfig::Expenditure => Box::new(Expenditure::new()),
    }
}
