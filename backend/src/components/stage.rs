//! Lockdown stage scaling
//!
//! Scales the intervention excess mortality and disability rates of a set of
//! acute diseases by a time-varying stage factor `σ ∈ [0, 1]`:
//!
//! ```text
//! rate ← rate × (scale·σ + (1 − σ))
//! ```
//!
//! `σ = 0` leaves the rate unchanged and `σ = 1` applies the full
//! disease-specific scale.

use super::{Builder, Component, EvalContext, SetupError};
use crate::lookup::LookupTable;
use crate::models::cohort::CohortId;
use crate::pipeline::{names, PipelineError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Multiplier interpolating between no effect and the full scale
///
/// # Example
/// ```
/// use mslt_core_rs::components::stage::stage_multiplier;
///
/// assert_eq!(stage_multiplier(0.5, 1.0), 0.5);
/// assert_eq!(stage_multiplier(0.5, 0.0), 1.0);
/// assert_eq!(stage_multiplier(0.5, 0.5), 0.75);
/// ```
pub fn stage_multiplier(scale: f64, stage: f64) -> f64 {
    scale * stage + (1.0 - stage)
}

/// Lockdown component
pub struct Lockdown {
    name: String,
    data_name: String,
    mortality: BTreeMap<String, f64>,
    morbidity: BTreeMap<String, f64>,
    stage: Option<Arc<dyn LookupTable>>,
    scales: HashMap<String, f64>,
}

impl Lockdown {
    /// Create a lockdown reading `stage.<data_name>.stage3and4`
    ///
    /// `mortality` and `morbidity` map disease names to the scale applied at
    /// full stage.
    pub fn new(
        data_name: impl Into<String>,
        mortality: BTreeMap<String, f64>,
        morbidity: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            name: "lockdown".to_string(),
            data_name: data_name.into(),
            mortality,
            morbidity,
            stage: None,
            scales: HashMap::new(),
        }
    }

    fn register(
        &mut self,
        builder: &mut Builder<'_>,
        measure: &str,
        scales: &BTreeMap<String, f64>,
    ) -> Result<(), SetupError> {
        for (disease, &scale) in scales {
            if !(scale >= 0.0) || !scale.is_finite() {
                return Err(SetupError::InvalidScale {
                    component: format!("{}:{}", self.name, disease),
                    measure: measure.to_string(),
                    scale,
                });
            }
            let pipeline = names::intervention(disease, measure);
            builder.register_modifier(&pipeline);
            self.scales.insert(pipeline, scale);
        }
        Ok(())
    }
}

impl Component for Lockdown {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        self.stage = Some(builder.load(&format!("stage.{}.stage3and4", self.data_name))?);

        let mortality = self.mortality.clone();
        let morbidity = self.morbidity.clone();
        self.register(builder, names::EXCESS_MORTALITY, &mortality)?;
        self.register(builder, names::DISABILITY, &morbidity)
    }

    fn modify(
        &self,
        pipeline: &str,
        cohort: CohortId,
        value: f64,
        ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        let (Some(&scale), Some(stage)) = (self.scales.get(pipeline), self.stage.as_ref()) else {
            return Ok(value);
        };
        let cohort = ctx.cohort(cohort)?;
        let sigma = stage.query(cohort.age, cohort.sex, ctx.year());
        Ok(value * stage_multiplier(scale, sigma))
    }
}
