//! Health expenditure
//!
//! Produces per-person health cost pipelines from `population.expenditure`
//! and records total expenditure per track once populations are updated:
//!
//! ```text
//! expenditure     = population     × health_costs
//! bau_expenditure = bau_population × bau_health_costs
//! ```
//!
//! Interventions that change costs modify `health_costs`.

use super::{Builder, Component, EvalContext, SetupError};
use crate::models::state::StateUpdate;
use crate::pipeline::{names, PipelineError};

/// Expenditure component
#[derive(Debug, Clone)]
pub struct Expenditure {
    name: String,
}

impl Expenditure {
    pub fn new() -> Self {
        Self {
            name: "expenditure".to_string(),
        }
    }
}

impl Default for Expenditure {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Expenditure {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        let costs = builder.load("population.expenditure")?;
        builder.register_value_producer(names::HEALTH_COSTS, costs.clone())?;
        builder.register_value_producer(names::BAU_HEALTH_COSTS, costs)?;
        Ok(())
    }

    fn record_step(&self, ctx: &EvalContext<'_>) -> Result<Option<StateUpdate>, PipelineError> {
        let mut values = Vec::new();
        for id in ctx.state.tracked_ids() {
            let cohort = ctx.cohort(id)?;
            let bau = cohort.bau.population * ctx.rate(names::BAU_HEALTH_COSTS, id)?;
            let intervention =
                cohort.intervention.population * ctx.rate(names::HEALTH_COSTS, id)?;
            values.push((id, bau, intervention));
        }
        Ok(Some(StateUpdate::Expenditure { values }))
    }
}
