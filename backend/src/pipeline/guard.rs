//! Single-evaluation guard for aggregate pipelines

use super::PipelineError;
use crate::models::cohort::CohortId;
use std::collections::HashSet;

/// Records which (pipeline, cohort) pairs have been evaluated this step
///
/// # Example
/// ```
/// use mslt_core_rs::pipeline::EvaluationGuard;
///
/// let mut guard = EvaluationGuard::new();
/// guard.begin_step(1);
/// assert!(guard.claim("mortality_rate", 0).is_ok());
/// assert!(guard.claim("mortality_rate", 0).is_err());
///
/// guard.begin_step(2);
/// assert!(guard.claim("mortality_rate", 0).is_ok());
/// ```
#[derive(Debug, Default)]
pub struct EvaluationGuard {
    step: usize,
    seen: HashSet<(&'static str, CohortId)>,
}

impl EvaluationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all claims and start a new step
    pub fn begin_step(&mut self, step: usize) {
        self.step = step;
        self.seen.clear();
    }

    /// Claim the single evaluation of a pipeline for a cohort this step
    ///
    /// Only the fixed aggregate pipeline names are claimed, so claims borrow
    /// the name instead of copying it.
    pub fn claim(
        &mut self,
        pipeline: &'static str,
        cohort: CohortId,
    ) -> Result<(), PipelineError> {
        if !self.seen.insert((pipeline, cohort)) {
            return Err(PipelineError::DuplicateEvaluation {
                pipeline: pipeline.to_string(),
                cohort,
                step: self.step,
            });
        }
        Ok(())
    }

    /// Number of claims made this step
    pub fn claims(&self) -> usize {
        self.seen.len()
    }
}
