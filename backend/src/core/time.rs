//! Time management for the simulation
//!
//! The simulation operates in discrete steps of a fixed number of days,
//! starting at a calendar date. Step 0 is the simulation start date and
//! represents the initial state, not the state after one step.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days per year used to convert step sizes into fractions of a year
///
/// The quarter day accounts for leap years when cohorts age.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Manages simulation time in discrete steps
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use mslt_core_rs::SimulationClock;
///
/// let start = NaiveDate::from_ymd_opt(2011, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
/// let mut clock = SimulationClock::new(start, end, 365);
/// assert_eq!(clock.current_step(), 0);
/// assert_eq!(clock.current_year(), 2011);
///
/// clock.advance_step();
/// assert_eq!(clock.current_step(), 1);
/// assert_eq!(clock.current_year(), 2012);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    /// Date of step 0
    start: NaiveDate,
    /// Exclusive end date; no step begins on or after it
    end: NaiveDate,
    /// Length of one step in days
    step_days: u32,
    /// Steps elapsed since the start date
    current_step: usize,
}

impl SimulationClock {
    /// Create a new clock positioned at the start date
    ///
    /// # Arguments
    /// * `start` - First simulated date
    /// * `end` - Exclusive end date
    /// * `step_days` - Number of days per step
    pub fn new(start: NaiveDate, end: NaiveDate, step_days: u32) -> Self {
        assert!(step_days > 0, "step_days must be positive");
        Self {
            start,
            end,
            step_days,
            current_step: 0,
        }
    }

    /// Advance time by one step
    pub fn advance_step(&mut self) {
        self.current_step += 1;
    }

    /// Steps elapsed since the start date
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Calendar date of the current step
    pub fn current_date(&self) -> NaiveDate {
        let elapsed = self.current_step as i64 * i64::from(self.step_days);
        self.start + Duration::days(elapsed)
    }

    /// Calendar year of the current step, used to index lookup tables
    pub fn current_year(&self) -> i32 {
        self.current_date().year()
    }

    /// True while the clock still sits on the start date
    pub fn is_first_step(&self) -> bool {
        self.current_step == 0
    }

    /// True once the current date has reached the end date
    pub fn is_finished(&self) -> bool {
        self.current_date() >= self.end
    }

    /// Number of steps between the start and end dates
    ///
    /// # Example
    /// ```
    /// use chrono::NaiveDate;
    /// use mslt_core_rs::SimulationClock;
    ///
    /// let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    /// let end = NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
    /// let clock = SimulationClock::new(start, end, 7);
    /// assert_eq!(clock.total_steps(), 5);
    /// ```
    pub fn total_steps(&self) -> usize {
        let days = (self.end - self.start).num_days().max(0) as usize;
        let step = self.step_days as usize;
        (days + step - 1) / step
    }

    /// Fraction of a year covered by one step
    pub fn years_per_step(&self) -> f64 {
        f64::from(self.step_days) / DAYS_PER_YEAR
    }

    /// Step size in days
    pub fn step_days(&self) -> u32 {
        self.step_days
    }

    /// Simulation start date
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Simulation end date (exclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }
}
