//! Domain models for the life table simulator

pub mod cohort;
pub mod event;
pub mod state;

// Re-exports
pub use cohort::{Cohort, CohortId, Sex, Track, TrackState};
pub use event::{Event, EventLog};
pub use state::{
    AcuteRecord, ChronicState, ChronicTrack, Compartments, SimulationState, StateUpdate,
    DISEASE_UNIT_POPULATION,
};
