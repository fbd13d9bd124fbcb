//! Value Pipelines
//!
//! A pipeline is a named, composable value: one base producer (a lookup
//! table) folded through an ordered list of modifiers.
//!
//! # Evaluation
//!
//! ```text
//! value = producer(cohort)          // × years_per_step for rate pipelines
//! for modifier in registration order:
//!     value = modifier(cohort, value)
//! ```
//!
//! Registration order is evaluation order. Modifiers are never reordered or
//! deduplicated.
//!
//! # Critical Invariants
//!
//! 1. **Single Source**: a pipeline has exactly one base producer
//! 2. **Pure Reads**: evaluating a pipeline writes no state; component state
//!    changes happen in separate update phases
//! 3. **Once Per Step**: the aggregate pipelines are evaluated at most once per
//!    cohort per step, enforced by [`EvaluationGuard`]

mod guard;
pub mod names;

pub use guard::EvaluationGuard;

use crate::components::{ComponentId, EvalContext};
use crate::lookup::LookupTable;
use crate::models::cohort::CohortId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while registering or evaluating pipelines
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Pipeline not found: {0}")]
    UnknownPipeline(String),

    #[error("Pipeline {0} already has a base producer")]
    DuplicateSource(String),

    #[error("Pipeline {0} has modifiers but no base producer")]
    MissingSource(String),

    #[error("Cohort not found: {0}")]
    UnknownCohort(CohortId),

    #[error("Pipeline {pipeline} references unknown component {component}")]
    UnknownComponent {
        pipeline: String,
        component: ComponentId,
    },

    #[error("No {disease} state for cohort {cohort}")]
    MissingState { disease: String, cohort: CohortId },

    #[error("Pipeline {pipeline} produced {value} for cohort {cohort}")]
    NonFinite {
        pipeline: String,
        cohort: CohortId,
        value: f64,
    },

    #[error("Pipeline {pipeline} evaluated twice for cohort {cohort} in step {step}")]
    DuplicateEvaluation {
        pipeline: String,
        cohort: CohortId,
        step: usize,
    },
}

/// How a pipeline's base producer is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// Annual hazard, rescaled to a per-step hazard at the source
    Rate,
    /// Proportion or factor, used as read
    Value,
}

/// Plain function modifier: `(cohort, current value) → new value`
pub type ModifierFn = Box<dyn Fn(CohortId, f64) -> f64 + Send + Sync>;

/// One entry in a pipeline's modifier list
pub enum Modifier {
    /// Dispatch to [`Component::modify`](crate::components::Component::modify)
    Component(ComponentId),
    /// Stateless function
    Function { label: String, apply: ModifierFn },
}

impl Modifier {
    /// Wrap a closure as a modifier
    pub fn function(
        label: impl Into<String>,
        apply: impl Fn(CohortId, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Modifier::Function {
            label: label.into(),
            apply: Box::new(apply),
        }
    }
}

impl fmt::Debug for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Component(id) => write!(f, "Component({})", id),
            Modifier::Function { label, .. } => write!(f, "Function({})", label),
        }
    }
}

#[derive(Debug, Default)]
struct Pipeline {
    source: Option<(PipelineKind, Arc<dyn LookupTable>)>,
    modifiers: Vec<Modifier>,
}

/// Registry of every named pipeline in a simulation
///
/// Owned by the simulation and handed to components during setup; there is
/// no global registry.
///
/// # Example
/// ```
/// use mslt_core_rs::lookup::ConstantTable;
/// use mslt_core_rs::pipeline::{Modifier, PipelineKind, RateRegistry};
///
/// let mut registry = RateRegistry::new();
/// registry
///     .register_base("yld_rate", PipelineKind::Value, ConstantTable::new(0.1).unwrap())
///     .unwrap();
/// registry.register_modifier("yld_rate", Modifier::function("halve", |_, v| v * 0.5));
///
/// assert!(registry.has_source("yld_rate"));
/// assert_eq!(registry.modifier_count("yld_rate"), 1);
/// ```
#[derive(Debug, Default)]
pub struct RateRegistry {
    pipelines: BTreeMap<String, Pipeline>,
}

impl RateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a pipeline's base producer; fails if one is already set
    pub fn register_base(
        &mut self,
        name: &str,
        kind: PipelineKind,
        table: impl LookupTable + 'static,
    ) -> Result<(), PipelineError> {
        self.register_shared_base(name, kind, Arc::new(table))
    }

    /// Set a pipeline's base producer from a shared table
    pub fn register_shared_base(
        &mut self,
        name: &str,
        kind: PipelineKind,
        table: Arc<dyn LookupTable>,
    ) -> Result<(), PipelineError> {
        let pipeline = self.pipelines.entry(name.to_string()).or_default();
        if pipeline.source.is_some() {
            return Err(PipelineError::DuplicateSource(name.to_string()));
        }
        pipeline.source = Some((kind, table));
        Ok(())
    }

    /// Append a modifier to a pipeline
    ///
    /// The pipeline need not have a base producer yet; [`validate`](Self::validate)
    /// checks that one arrives before the simulation runs.
    pub fn register_modifier(&mut self, name: &str, modifier: Modifier) {
        self.pipelines
            .entry(name.to_string())
            .or_default()
            .modifiers
            .push(modifier);
    }

    pub fn has_source(&self, name: &str) -> bool {
        self.pipelines
            .get(name)
            .map_or(false, |p| p.source.is_some())
    }

    pub fn modifier_count(&self, name: &str) -> usize {
        self.pipelines.get(name).map_or(0, |p| p.modifiers.len())
    }

    /// Names of every pipeline, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipelines.keys().map(String::as_str)
    }

    /// Check that every pipeline with modifiers also has a base producer
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, pipeline) in &self.pipelines {
            if pipeline.source.is_none() {
                return Err(PipelineError::MissingSource(name.clone()));
            }
        }
        Ok(())
    }

    /// Evaluate a pipeline for one cohort
    ///
    /// Queries the base producer at the cohort's age, sex and the current
    /// year, rescales rate pipelines to the step length, then folds every
    /// modifier in registration order.
    pub fn evaluate(
        &self,
        name: &str,
        cohort_id: CohortId,
        ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        let pipeline = self
            .pipelines
            .get(name)
            .ok_or_else(|| PipelineError::UnknownPipeline(name.to_string()))?;
        let (kind, table) = pipeline
            .source
            .as_ref()
            .ok_or_else(|| PipelineError::MissingSource(name.to_string()))?;
        let cohort = ctx.cohort(cohort_id)?;

        let mut value = table.query(cohort.age, cohort.sex, ctx.year());
        if *kind == PipelineKind::Rate {
            value *= ctx.years_per_step();
        }

        for modifier in &pipeline.modifiers {
            value = match modifier {
                Modifier::Component(id) => {
                    let component =
                        ctx.components
                            .get(*id)
                            .ok_or_else(|| PipelineError::UnknownComponent {
                                pipeline: name.to_string(),
                                component: *id,
                            })?;
                    component.modify(name, cohort_id, value, ctx)?
                }
                Modifier::Function { apply, .. } => apply(cohort_id, value),
            };
        }

        if !value.is_finite() {
            return Err(PipelineError::NonFinite {
                pipeline: name.to_string(),
                cohort: cohort_id,
                value,
            });
        }
        Ok(value)
    }
}
