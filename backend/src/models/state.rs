//! Simulation State
//!
//! Holds every cohort plus the private per-disease state of each disease
//! component, keyed by disease name.
//!
//! # Critical Invariants
//!
//! 1. **Stable Cohort Identity**: cohorts are never removed; retired cohorts
//!    keep their slot with `tracked == false`
//! 2. **Per-Disease Isolation**: each disease owns exactly one entry in its
//!    state map, with one value per cohort
//! 3. **Unit Population**: chronic compartments are fractions of a fixed unit
//!    population of [`DISEASE_UNIT_POPULATION`], independent of head count

use crate::models::cohort::{Cohort, CohortId, Track};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size of the arbitrary unit population used for disease compartments
///
/// 1000 units represents a prevalence denominator of 100%.
pub const DISEASE_UNIT_POPULATION: f64 = 1000.0;

/// Susceptible and case occupancy of one chronic disease track
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Compartments {
    /// Units without the disease
    pub susceptible: f64,
    /// Units with the disease
    pub cases: f64,
}

impl Compartments {
    pub fn new(susceptible: f64, cases: f64) -> Self {
        Self { susceptible, cases }
    }

    /// Compartments for a given prevalence proportion
    ///
    /// # Example
    /// ```
    /// use mslt_core_rs::models::Compartments;
    ///
    /// let c = Compartments::from_prevalence(0.1);
    /// assert_eq!(c.cases, 100.0);
    /// assert_eq!(c.susceptible, 900.0);
    /// ```
    pub fn from_prevalence(prevalence: f64) -> Self {
        let cases = DISEASE_UNIT_POPULATION * prevalence;
        Self {
            susceptible: DISEASE_UNIT_POPULATION - cases,
            cases,
        }
    }

    /// Surviving units
    pub fn alive(&self) -> f64 {
        self.susceptible + self.cases
    }

    /// Units that have died since the unit population was created
    pub fn dead(&self) -> f64 {
        DISEASE_UNIT_POPULATION - self.alive()
    }
}

/// Current and previous compartments for one track
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChronicTrack {
    pub current: Compartments,
    pub previous: Compartments,
}

impl ChronicTrack {
    /// Start a track whose previous state equals its current state
    pub fn new(initial: Compartments) -> Self {
        Self {
            current: initial,
            previous: initial,
        }
    }

    /// Shift current into previous and install the next compartments
    pub fn advance(&mut self, next: Compartments) {
        self.previous = self.current;
        self.current = next;
    }
}

/// Chronic disease state of one cohort, both tracks
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChronicState {
    pub bau: ChronicTrack,
    pub intervention: ChronicTrack,
}

impl ChronicState {
    /// Both tracks start from the same compartments
    pub fn new(initial: Compartments) -> Self {
        Self {
            bau: ChronicTrack::new(initial),
            intervention: ChronicTrack::new(initial),
        }
    }

    pub fn track(&self, track: Track) -> &ChronicTrack {
        match track {
            Track::Bau => &self.bau,
            Track::Intervention => &self.intervention,
        }
    }
}

/// Observational acute disease bookkeeping for one cohort
///
/// Overwritten each step. Never feeds back into any transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AcuteRecord {
    pub deaths: f64,
    pub deaths_bau: f64,
    pub haly: f64,
    pub haly_bau: f64,
}

/// A batch of state writes produced by a component
///
/// Components never mutate [`SimulationState`] directly; they return
/// updates which the engine applies between phases.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// Replace chronic state for the listed cohorts
    Chronic {
        disease: String,
        states: Vec<(CohortId, ChronicState)>,
    },
    /// Replace acute bookkeeping for the listed cohorts
    Acute {
        disease: String,
        records: Vec<(CohortId, AcuteRecord)>,
    },
    /// Set expenditure on both tracks: (cohort, bau, intervention)
    Expenditure { values: Vec<(CohortId, f64, f64)> },
}

/// Complete simulation state
///
/// # Example
///
/// ```rust
/// use mslt_core_rs::{Cohort, Sex, SimulationState};
///
/// let state = SimulationState::new(vec![
///     Cohort::new(0, 20.0, Sex::Male, 1_000.0),
///     Cohort::new(1, 20.0, Sex::Female, 1_100.0),
/// ]);
/// assert_eq!(state.num_cohorts(), 2);
/// assert_eq!(state.tracked_ids(), vec![0, 1]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    /// All cohorts, indexed by [`CohortId`]
    cohorts: Vec<Cohort>,

    /// Chronic disease state per disease, one entry per cohort
    chronic: BTreeMap<String, Vec<ChronicState>>,

    /// Acute disease bookkeeping per disease, one entry per cohort
    acute: BTreeMap<String, Vec<AcuteRecord>>,
}

impl SimulationState {
    /// Create a state from cohorts
    ///
    /// # Panics
    ///
    /// Panics if a cohort's id does not match its position.
    pub fn new(cohorts: Vec<Cohort>) -> Self {
        for (index, cohort) in cohorts.iter().enumerate() {
            assert_eq!(
                cohort.id, index,
                "Cohort id {} stored at position {}",
                cohort.id, index
            );
        }
        Self {
            cohorts,
            chronic: BTreeMap::new(),
            acute: BTreeMap::new(),
        }
    }

    pub fn num_cohorts(&self) -> usize {
        self.cohorts.len()
    }

    /// Number of cohorts still in the active set
    pub fn num_tracked(&self) -> usize {
        self.cohorts.iter().filter(|c| c.tracked).count()
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    pub fn cohorts_mut(&mut self) -> &mut [Cohort] {
        &mut self.cohorts
    }

    pub fn cohort(&self, id: CohortId) -> Option<&Cohort> {
        self.cohorts.get(id)
    }

    pub fn cohort_mut(&mut self, id: CohortId) -> Option<&mut Cohort> {
        self.cohorts.get_mut(id)
    }

    /// Ids of cohorts that take part in pipeline evaluation this step
    pub fn tracked_ids(&self) -> Vec<CohortId> {
        self.cohorts
            .iter()
            .filter(|c| c.tracked)
            .map(|c| c.id)
            .collect()
    }

    /// Chronic state of one disease for one cohort
    pub fn chronic_state(&self, disease: &str, id: CohortId) -> Option<&ChronicState> {
        self.chronic.get(disease).and_then(|states| states.get(id))
    }

    /// Acute bookkeeping of one disease for one cohort
    pub fn acute_record(&self, disease: &str, id: CohortId) -> Option<&AcuteRecord> {
        self.acute.get(disease).and_then(|records| records.get(id))
    }

    /// Names of diseases with chronic state
    pub fn chronic_diseases(&self) -> impl Iterator<Item = &str> {
        self.chronic.keys().map(String::as_str)
    }

    /// Names of diseases with acute bookkeeping
    pub fn acute_diseases(&self) -> impl Iterator<Item = &str> {
        self.acute.keys().map(String::as_str)
    }

    /// Apply a component's writes
    ///
    /// The first update for a disease creates its state map with one default
    /// entry per cohort.
    pub fn apply(&mut self, update: StateUpdate) {
        let num_cohorts = self.cohorts.len();
        match update {
            StateUpdate::Chronic { disease, states } => {
                let slots = self
                    .chronic
                    .entry(disease)
                    .or_insert_with(|| vec![ChronicState::default(); num_cohorts]);
                for (id, state) in states {
                    if let Some(slot) = slots.get_mut(id) {
                        *slot = state;
                    }
                }
            }
            StateUpdate::Acute { disease, records } => {
                let slots = self
                    .acute
                    .entry(disease)
                    .or_insert_with(|| vec![AcuteRecord::default(); num_cohorts]);
                for (id, record) in records {
                    if let Some(slot) = slots.get_mut(id) {
                        *slot = record;
                    }
                }
            }
            StateUpdate::Expenditure { values } => {
                for (id, bau, intervention) in values {
                    if let Some(cohort) = self.cohorts.get_mut(id) {
                        cohort.bau.expenditure = bau;
                        cohort.intervention.expenditure = intervention;
                    }
                }
            }
        }
    }
}
