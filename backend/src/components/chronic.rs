//! Chronic Disease
//!
//! Tracks Susceptible/Case occupancy of a fixed unit population per cohort
//! on both tracks, and turns the difference between the tracks into
//! contributions to the aggregate mortality and disability pipelines.
//!
//! # Pipelines
//!
//! Produces `<d>.incidence`, `<d>_intervention.incidence`, `<d>.remission`,
//! `<d>.excess_mortality` (rates) and `<d>.yld_rate` (value). Interventions
//! act by modifying `<d>_intervention.incidence`.
//!
//! # Per step
//!
//! 1. `prepare_step` solves the compartments of every tracked cohort, except
//!    on the first step where the loaded prevalence is the starting state
//! 2. `modify` adds, from the already updated state,
//!    - `ln((1 − risk_bau) / (1 − risk_int))` to `mortality_rate`
//!    - `(prevalence_int − prevalence_bau) × disability` to `yld_rate`

use super::transition::{solve, solve_remission_free, TransitionRates};
use super::{Builder, Component, EvalContext, SetupError};
use crate::core::time::SimulationClock;
use crate::lookup::LookupTable;
use crate::models::cohort::CohortId;
use crate::models::state::{ChronicState, ChronicTrack, Compartments, SimulationState, StateUpdate};
use crate::pipeline::{names, PipelineError};
use std::sync::Arc;

/// Upper bound applied to a per-step mortality risk before taking logs
const MAX_RISK: f64 = 1.0 - 1e-12;

/// Share of the previous step's survivors that died during the step
///
/// Zero when no unit survived the previous step.
pub fn mortality_risk(track: &ChronicTrack) -> f64 {
    let survivors = track.previous.alive();
    if survivors <= 0.0 {
        return 0.0;
    }
    let risk = (track.current.dead() - track.previous.dead()) / survivors;
    if risk > MAX_RISK {
        log::warn!("clamping chronic mortality risk {} to {}", risk, MAX_RISK);
        MAX_RISK
    } else {
        risk
    }
}

/// Log-hazard change in all-cause mortality between the tracks
///
/// Negative when the intervention track loses fewer units than BAU.
pub fn mortality_delta(state: &ChronicState) -> f64 {
    let risk_bau = mortality_risk(&state.bau);
    let risk_int = mortality_risk(&state.intervention);
    (-risk_bau).ln_1p() - (-risk_int).ln_1p()
}

/// Mean prevalence over the step
///
/// The mean number of cases divided by the mean number alive; the halves
/// cancel. Zero when nobody is alive at either end of the step.
pub fn prevalence(track: &ChronicTrack) -> f64 {
    let alive = track.current.alive() + track.previous.alive();
    if alive <= 0.0 {
        return 0.0;
    }
    (track.current.cases + track.previous.cases) / alive
}

/// Change in the disability rate between the tracks
pub fn disability_delta(state: &ChronicState, disability_rate: f64) -> f64 {
    (prevalence(&state.intervention) - prevalence(&state.bau)) * disability_rate
}

/// Chronic disease component
pub struct ChronicDisease {
    name: String,
    simplified_no_remission_equations: bool,
    prevalence: Option<Arc<dyn LookupTable>>,
    incidence: String,
    incidence_intervention: String,
    remission: String,
    excess_mortality: String,
    disability: String,
}

impl ChronicDisease {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            incidence: names::bau(&name, names::INCIDENCE),
            incidence_intervention: names::intervention(&name, names::INCIDENCE),
            remission: names::bau(&name, names::REMISSION),
            excess_mortality: names::bau(&name, names::EXCESS_MORTALITY),
            disability: names::bau(&name, names::DISABILITY),
            name,
            simplified_no_remission_equations: false,
            prevalence: None,
        }
    }

    /// Use the simplified equations when remission is zero for every cohort
    pub fn with_simplified_no_remission_equations(mut self, enabled: bool) -> Self {
        self.simplified_no_remission_equations = enabled;
        self
    }

    fn state<'a>(
        &self,
        ctx: &EvalContext<'a>,
        cohort: CohortId,
    ) -> Result<&'a ChronicState, PipelineError> {
        ctx.state
            .chronic_state(&self.name, cohort)
            .ok_or_else(|| PipelineError::MissingState {
                disease: self.name.clone(),
                cohort,
            })
    }
}

/// Rates read once per cohort per step
struct StepRates {
    cohort: CohortId,
    incidence_bau: f64,
    incidence_int: f64,
    remission: f64,
    excess_mortality: f64,
}

impl Component for ChronicDisease {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        let prefix = format!("chronic_disease.{}", self.name);

        let incidence = builder.load(&format!("{}.incidence", prefix))?;
        builder.register_rate_producer(&self.incidence, incidence.clone())?;
        builder.register_rate_producer(&self.incidence_intervention, incidence)?;

        let remission = builder.load(&format!("{}.remission", prefix))?;
        builder.register_rate_producer(&self.remission, remission)?;

        let mortality = builder.load(&format!("{}.mortality", prefix))?;
        builder.register_rate_producer(&self.excess_mortality, mortality)?;

        let morbidity = builder.load(&format!("{}.morbidity", prefix))?;
        builder.register_value_producer(&self.disability, morbidity)?;

        self.prevalence = Some(builder.load(&format!("{}.prevalence", prefix))?);

        builder.register_modifier(names::MORTALITY_RATE);
        builder.register_modifier(names::YLD_RATE);
        Ok(())
    }

    fn initialize(&self, state: &SimulationState, clock: &SimulationClock) -> Option<StateUpdate> {
        let table = self.prevalence.as_ref()?;
        let year = clock.current_year();
        let states = state
            .cohorts()
            .iter()
            .map(|cohort| {
                let prevalence = table.query(cohort.age, cohort.sex, year);
                (cohort.id, ChronicState::new(Compartments::from_prevalence(prevalence)))
            })
            .collect();
        Some(StateUpdate::Chronic {
            disease: self.name.clone(),
            states,
        })
    }

    fn prepare_step(&self, ctx: &EvalContext<'_>) -> Result<Option<StateUpdate>, PipelineError> {
        // The loaded prevalence already describes the first step.
        if ctx.clock.is_first_step() {
            return Ok(None);
        }

        // Read every rate once only.
        let mut rates = Vec::new();
        for cohort in ctx.state.tracked_ids() {
            rates.push(StepRates {
                cohort,
                incidence_bau: ctx.rate(&self.incidence, cohort)?,
                incidence_int: ctx.rate(&self.incidence_intervention, cohort)?,
                remission: ctx.rate(&self.remission, cohort)?,
                excess_mortality: ctx.rate(&self.excess_mortality, cohort)?,
            });
        }

        let remission_free =
            self.simplified_no_remission_equations && rates.iter().all(|r| r.remission == 0.0);

        let mut states = Vec::with_capacity(rates.len());
        for step in &rates {
            let mut state = *self.state(ctx, step.cohort)?;
            let advance = |current: Compartments, incidence: f64| {
                if remission_free {
                    solve_remission_free(current, incidence, step.excess_mortality)
                } else {
                    let rates =
                        TransitionRates::new(incidence, step.remission, step.excess_mortality);
                    solve(current, rates)
                }
            };
            let bau = advance(state.bau.current, step.incidence_bau);
            let int = advance(state.intervention.current, step.incidence_int);
            state.bau.advance(bau);
            state.intervention.advance(int);
            states.push((step.cohort, state));
        }

        Ok(Some(StateUpdate::Chronic {
            disease: self.name.clone(),
            states,
        }))
    }

    fn modify(
        &self,
        pipeline: &str,
        cohort: CohortId,
        value: f64,
        ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        let state = self.state(ctx, cohort)?;
        match pipeline {
            names::MORTALITY_RATE => Ok(value + mortality_delta(state)),
            names::YLD_RATE => {
                let disability = ctx.rate(&self.disability, cohort)?;
                Ok(value + disability_delta(state, disability))
            }
            _ => Ok(value),
        }
    }
}
