//! Acute Disease
//!
//! An acute disease is short relative to the step, so it has no prevalence.
//! It contributes an excess mortality rate and a disability rate directly,
//! as the difference between its intervention and BAU sub-pipelines.
//!
//! With `no_bau` set the disease only exists on the intervention track and
//! its full intervention rates are added.
//!
//! Deaths and HALYs attributable to the disease are written to its
//! [`AcuteRecord`] after each step for observers; they never feed back into
//! the simulation.

use super::{Builder, Component, EvalContext, SetupError};
use crate::core::time::SimulationClock;
use crate::models::cohort::CohortId;
use crate::models::state::{AcuteRecord, SimulationState, StateUpdate};
use crate::pipeline::{names, PipelineError};

/// Acute disease component
#[derive(Debug, Clone)]
pub struct AcuteDisease {
    name: String,
    data_name: String,
    no_bau: bool,
    mortality: String,
    mortality_intervention: String,
    disability: String,
    disability_intervention: String,
}

impl AcuteDisease {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            data_name: name.clone(),
            no_bau: false,
            mortality: names::bau(&name, names::EXCESS_MORTALITY),
            mortality_intervention: names::intervention(&name, names::EXCESS_MORTALITY),
            disability: names::bau(&name, names::DISABILITY),
            disability_intervention: names::intervention(&name, names::DISABILITY),
            name,
        }
    }

    /// Load tables under a different name than the component name
    pub fn with_data_name(mut self, data_name: impl Into<String>) -> Self {
        self.data_name = data_name.into();
        self
    }

    /// Model the disease on the intervention track only
    pub fn with_no_bau(mut self, no_bau: bool) -> Self {
        self.no_bau = no_bau;
        self
    }

    /// Difference added to an aggregate pipeline
    fn delta(
        &self,
        bau: &str,
        intervention: &str,
        cohort: CohortId,
        ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        let int_rate = ctx.rate(intervention, cohort)?;
        if self.no_bau {
            Ok(int_rate)
        } else {
            Ok(int_rate - ctx.rate(bau, cohort)?)
        }
    }
}

impl Component for AcuteDisease {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        let prefix = format!("acute_disease.{}", self.data_name);

        let mortality = builder.load(&format!("{}.mortality", prefix))?;
        builder.register_rate_producer(&self.mortality, mortality.clone())?;
        builder.register_rate_producer(&self.mortality_intervention, mortality)?;

        let morbidity = builder.load(&format!("{}.morbidity", prefix))?;
        builder.register_value_producer(&self.disability, morbidity.clone())?;
        builder.register_value_producer(&self.disability_intervention, morbidity)?;

        builder.register_modifier(names::MORTALITY_RATE);
        builder.register_modifier(names::YLD_RATE);
        Ok(())
    }

    fn initialize(&self, state: &SimulationState, _clock: &SimulationClock) -> Option<StateUpdate> {
        Some(StateUpdate::Acute {
            disease: self.name.clone(),
            records: state
                .cohorts()
                .iter()
                .map(|cohort| (cohort.id, AcuteRecord::default()))
                .collect(),
        })
    }

    fn modify(
        &self,
        pipeline: &str,
        cohort: CohortId,
        value: f64,
        ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        match pipeline {
            names::MORTALITY_RATE => {
                Ok(value + self.delta(&self.mortality, &self.mortality_intervention, cohort, ctx)?)
            }
            names::YLD_RATE => {
                Ok(value + self.delta(&self.disability, &self.disability_intervention, cohort, ctx)?)
            }
            _ => Ok(value),
        }
    }

    fn record_step(&self, ctx: &EvalContext<'_>) -> Result<Option<StateUpdate>, PipelineError> {
        let mut records = Vec::new();
        for id in ctx.state.tracked_ids() {
            let cohort = ctx.cohort(id)?;
            let mut record = AcuteRecord {
                deaths: cohort.intervention.population_at_step_start()
                    * ctx.rate(&self.mortality_intervention, id)?,
                haly: -cohort.intervention.person_years
                    * ctx.rate(&self.disability_intervention, id)?,
                ..AcuteRecord::default()
            };
            if !self.no_bau {
                record.deaths_bau =
                    cohort.bau.population_at_step_start() * ctx.rate(&self.mortality, id)?;
                record.haly_bau = -cohort.bau.person_years * ctx.rate(&self.disability, id)?;
            }
            records.push((id, record));
        }
        Ok(Some(StateUpdate::Acute {
            disease: self.name.clone(),
            records,
        }))
    }
}
