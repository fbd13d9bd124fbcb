//! Fixed-factor rate scalers
//!
//! Crude adjustments that multiply one pipeline by a constant or by a
//! table-driven factor. Each is registered like any other modifier.

use super::{Builder, Component, EvalContext, SetupError};
use crate::lookup::LookupTable;
use crate::models::cohort::CohortId;
use crate::pipeline::{names, PipelineError};
use std::sync::Arc;

/// Default factor for the magic-wand shifts
const DEFAULT_SHIFT: f64 = 0.5;

/// Multiplies one pipeline by a constant factor
///
/// # Example
/// ```
/// use mslt_core_rs::components::{Component, ScaleModifier};
///
/// let shift = ScaleModifier::incidence_shift("chd", Some(0.2));
/// assert_eq!(shift.name(), "chd_incidence_shift");
/// assert_eq!(shift.target(), "chd_intervention.incidence");
/// assert!((shift.factor() - 0.8).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleModifier {
    name: String,
    measure: String,
    target: String,
    factor: f64,
}

impl ScaleModifier {
    pub fn new(
        name: impl Into<String>,
        measure: impl Into<String>,
        target: impl Into<String>,
        factor: f64,
    ) -> Self {
        Self {
            name: name.into(),
            measure: measure.into(),
            target: target.into(),
            factor,
        }
    }

    /// Halve the intervention all-cause mortality hazard
    pub fn mortality_shift() -> Self {
        Self::new("mortality_shift", "mortality", names::MORTALITY_RATE, DEFAULT_SHIFT)
    }

    /// Halve the intervention disability rate
    pub fn yld_shift() -> Self {
        Self::new("yld_shift", "disability", names::YLD_RATE, DEFAULT_SHIFT)
    }

    /// Reduce a chronic disease's intervention incidence by `rate_reduce`
    /// (halved when not given)
    pub fn incidence_shift(disease: &str, rate_reduce: Option<f64>) -> Self {
        let factor = rate_reduce.map_or(DEFAULT_SHIFT, |reduce| 1.0 - reduce);
        Self::new(
            format!("{}_incidence_shift", disease),
            names::INCIDENCE,
            names::intervention(disease, names::INCIDENCE),
            factor,
        )
    }

    /// Scale an acute disease's intervention excess mortality
    pub fn acute_mortality(disease: &str, scale: f64) -> Self {
        Self::new(
            format!("{}_mortality_scale", disease),
            "mortality",
            names::intervention(disease, names::EXCESS_MORTALITY),
            scale,
        )
    }

    /// Scale an acute disease's intervention disability rate
    pub fn acute_yld(disease: &str, scale: f64) -> Self {
        Self::new(
            format!("{}_yld_scale", disease),
            "YLD",
            names::intervention(disease, names::DISABILITY),
            scale,
        )
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }
}

impl Component for ScaleModifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        if !(self.factor >= 0.0) || !self.factor.is_finite() {
            return Err(SetupError::InvalidScale {
                component: self.name.clone(),
                measure: self.measure.clone(),
                scale: self.factor,
            });
        }
        builder.register_modifier(&self.target);
        Ok(())
    }

    fn modify(
        &self,
        _pipeline: &str,
        _cohort: CohortId,
        value: f64,
        _ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        Ok(value * self.factor)
    }
}

/// Multiplies the intervention mortality hazard by `mortality_effects.<name>`
pub struct MortalityEffects {
    name: String,
    data_name: String,
    effects: Option<Arc<dyn LookupTable>>,
}

impl MortalityEffects {
    pub fn new(data_name: impl Into<String>) -> Self {
        let data_name = data_name.into();
        Self {
            name: format!("{}_mort_effects", data_name),
            data_name,
            effects: None,
        }
    }
}

impl Component for MortalityEffects {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        self.effects = Some(builder.load(&format!("mortality_effects.{}", self.data_name))?);
        builder.register_modifier(names::MORTALITY_RATE);
        Ok(())
    }

    fn modify(
        &self,
        _pipeline: &str,
        cohort: CohortId,
        value: f64,
        ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        let Some(effects) = self.effects.as_ref() else {
            return Ok(value);
        };
        let cohort = ctx.cohort(cohort)?;
        Ok(value * effects.query(cohort.age, cohort.sex, ctx.year()))
    }
}
