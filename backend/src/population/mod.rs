//! Cohort Population Update
//!
//! Pure per-track arithmetic applied once per step after the aggregate
//! pipelines have been read, plus aging and retirement.
//!
//! # Per track
//!
//! ```text
//! pr_death     = 1 − exp(−hazard)
//! deaths       = population × pr_death
//! population  ← population × (1 − pr_death)
//! person_years = (population + 0.5 × deaths) × years_per_step
//! haly         = person_years × (1 − yld_rate)
//! ```
//!
//! The hazard is already a per-step hazard; rate pipelines are rescaled at
//! their source.

use crate::models::cohort::{Cohort, CohortId, TrackState};

/// Probability of dying within a step with the given hazard
pub fn probability_of_death(hazard: f64) -> f64 {
    -(-hazard).exp_m1()
}

/// Deaths and survivors for a head count; returns `(deaths, survivors)`
///
/// # Example
/// ```
/// use mslt_core_rs::population::apply_mortality;
///
/// let (deaths, survivors) = apply_mortality(1_000.0, 0.0);
/// assert_eq!(deaths, 0.0);
/// assert_eq!(survivors, 1_000.0);
/// ```
pub fn apply_mortality(population: f64, hazard: f64) -> (f64, f64) {
    let pr_death = probability_of_death(hazard);
    (population * pr_death, population * (1.0 - pr_death))
}

/// Person-years lived during the step, counting deaths at the midpoint
pub fn person_years(survivors: f64, deaths: f64, years_per_step: f64) -> f64 {
    (survivors + 0.5 * deaths) * years_per_step
}

/// Health-adjusted life years
pub fn haly(person_years: f64, yld_rate: f64) -> f64 {
    person_years * (1.0 - yld_rate)
}

/// Apply one step of mortality and disability to a track
pub fn update_track(track: &mut TrackState, hazard: f64, yld_rate: f64, years_per_step: f64) {
    let (deaths, survivors) = apply_mortality(track.population, hazard);
    track.acmr = hazard;
    track.pr_death = probability_of_death(hazard);
    track.deaths = deaths;
    track.population = survivors;
    track.yld_rate = yld_rate;
    track.person_years = person_years(survivors, deaths, years_per_step);
    track.haly = haly(track.person_years, yld_rate);
}

/// Age every tracked cohort and retire those past `max_age`
///
/// Returns the ids retired by this call. Retired cohorts keep their slot and
/// their last state.
pub fn age_and_retire(cohorts: &mut [Cohort], increment: f64, max_age: f64) -> Vec<CohortId> {
    let mut retired = Vec::new();
    for cohort in cohorts.iter_mut().filter(|c| c.tracked) {
        cohort.age += increment;
        if cohort.age > max_age {
            cohort.tracked = false;
            retired.push(cohort.id);
        }
    }
    retired
}
