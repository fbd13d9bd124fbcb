//! Cohort model
//!
//! A cohort is a group of simulated people sharing age and sex, evolved as
//! aggregate head counts. Every cohort carries two independent tracks:
//! - **BAU**: evolves under the unmodified base rates
//! - **Intervention**: evolves under rates that include every registered modifier
//!
//! Both tracks share the cohort's identity and clock.

use serde::{Deserialize, Serialize};

/// Index of a cohort within the simulation state
///
/// Cohorts are never physically removed, so the index is stable for the
/// lifetime of a simulation.
pub type CohortId = usize;

/// Sex of a cohort, one of the lookup table keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// Scenario track selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    /// Business-as-usual reference track
    Bau,
    /// Track including every intervention modifier
    Intervention,
}

/// Per-track cohort quantities
///
/// All values are overwritten each step except `population`, which carries
/// forward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    /// Surviving head count (real-valued)
    pub population: f64,
    /// All-cause mortality hazard realized this step
    pub acmr: f64,
    /// Probability of death this step
    pub pr_death: f64,
    /// Deaths this step
    pub deaths: f64,
    /// Disability rate realized this step
    pub yld_rate: f64,
    /// Person-years lived this step
    pub person_years: f64,
    /// Health-adjusted life years lived this step
    pub haly: f64,
    /// Health expenditure this step (zero unless expenditure is modelled)
    pub expenditure: f64,
}

impl TrackState {
    /// Create a track with the given head count and no history
    pub fn new(population: f64) -> Self {
        Self {
            population,
            ..Self::default()
        }
    }

    /// Head count before this step's deaths were removed
    pub fn population_at_step_start(&self) -> f64 {
        self.population + self.deaths
    }
}

/// A single (age, sex) cohort
///
/// # Example
/// ```
/// use mslt_core_rs::{Cohort, Sex, Track};
///
/// let cohort = Cohort::new(0, 52.0, Sex::Female, 1_500.0);
/// assert!(cohort.tracked);
/// assert_eq!(cohort.track(Track::Bau).population, 1_500.0);
/// assert_eq!(cohort.track(Track::Intervention).population, 1_500.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cohort {
    /// Stable index of this cohort
    pub id: CohortId,
    /// Current age in years (fractional for sub-annual steps)
    pub age: f64,
    /// Sex of the cohort
    pub sex: Sex,
    /// False once the cohort has aged past the maximum age
    pub tracked: bool,
    /// Business-as-usual track
    pub bau: TrackState,
    /// Intervention track
    pub intervention: TrackState,
}

impl Cohort {
    /// Create a tracked cohort with identical head counts on both tracks
    pub fn new(id: CohortId, age: f64, sex: Sex, population: f64) -> Self {
        Self {
            id,
            age,
            sex,
            tracked: true,
            bau: TrackState::new(population),
            intervention: TrackState::new(population),
        }
    }

    /// Borrow one track
    pub fn track(&self, track: Track) -> &TrackState {
        match track {
            Track::Bau => &self.bau,
            Track::Intervention => &self.intervention,
        }
    }

    /// Mutably borrow one track
    pub fn track_mut(&mut self, track: Track) -> &mut TrackState {
        match track {
            Track::Bau => &mut self.bau,
            Track::Intervention => &mut self.intervention,
        }
    }
}
