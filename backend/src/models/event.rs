//! Event logging for simulation auditing.
//!
//! This module defines the Event enum which captures the significant state
//! changes of a run. Events enable:
//! - Debugging (understand which cohorts retired and when)
//! - Auditing (verify every disease advanced exactly once per step)
//! - Reporting (per-step totals for downstream aggregation)
//!
//! # Example
//!
//! ```rust
//! use mslt_core_rs::models::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::CohortRetired { step: 3, cohort_id: 7, age: 110.2 });
//!
//! assert_eq!(log.events_at_step(3).len(), 1);
//! assert_eq!(log.events_for_cohort(7).len(), 1);
//! ```

use crate::models::cohort::CohortId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Simulation event capturing a state change.
///
/// All events include a step number for temporal ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum Event {
    /// Initial cohort and component state has been loaded
    SimulationInitialized {
        step: usize,
        num_cohorts: usize,
        components: Vec<String>,
    },

    /// A cohort aged past the maximum age and left the active set
    CohortRetired {
        step: usize,
        cohort_id: CohortId,
        age: f64,
    },

    /// A chronic disease solved its compartments for every tracked cohort
    DiseaseStateAdvanced {
        step: usize,
        disease: String,
        num_cohorts: usize,
    },

    /// Population, deaths and HALYs were updated for the step
    StepCompleted {
        step: usize,
        date: NaiveDate,
        tracked_cohorts: usize,
        deaths: f64,
        bau_deaths: f64,
    },
}

impl Event {
    /// Step at which the event occurred
    pub fn step(&self) -> usize {
        match self {
            Event::SimulationInitialized { step, .. }
            | Event::CohortRetired { step, .. }
            | Event::DiseaseStateAdvanced { step, .. }
            | Event::StepCompleted { step, .. } => *step,
        }
    }

    /// Event type name
    pub fn event_type(&self) -> &str {
        match self {
            Event::SimulationInitialized { .. } => "SimulationInitialized",
            Event::CohortRetired { .. } => "CohortRetired",
            Event::DiseaseStateAdvanced { .. } => "DiseaseStateAdvanced",
            Event::StepCompleted { .. } => "StepCompleted",
        }
    }

    /// Cohort the event refers to, if any
    pub fn cohort_id(&self) -> Option<CohortId> {
        match self {
            Event::CohortRetired { cohort_id, .. } => Some(*cohort_id),
            _ => None,
        }
    }

    /// Disease the event refers to, if any
    pub fn disease(&self) -> Option<&str> {
        match self {
            Event::DiseaseStateAdvanced { disease, .. } => Some(disease),
            _ => None,
        }
    }
}

/// Append-only event log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Get the number of events logged
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Get all events
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific step
    pub fn events_at_step(&self, step: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.step() == step).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific cohort
    pub fn events_for_cohort(&self, cohort_id: CohortId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.cohort_id() == Some(cohort_id))
            .collect()
    }

    /// Get events for a specific disease
    pub fn events_for_disease(&self, disease: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.disease() == Some(disease))
            .collect()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
