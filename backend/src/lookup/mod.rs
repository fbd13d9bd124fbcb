//! Lookup Tables
//!
//! A lookup table answers `(age, sex, year) → value` and is the only way the
//! simulation reads external data. Tables are validated when they are built;
//! queries are total and never fail.
//!
//! # Table kinds
//!
//! - [`ConstantTable`]: one value everywhere
//! - [`BinnedTable`]: half-open `[start, end)` age and year bins, optionally
//!   keyed by sex
//!
//! Tables are collected in [`InputTables`] under the keys components load at
//! setup, e.g. `chronic_disease.chd.incidence`.

mod binned;
mod source;

pub use binned::{BinnedTable, TableRow};
pub use source::{InputTables, PopulationRow};

use crate::models::cohort::Sex;
use thiserror::Error;

/// Errors raised while building or loading lookup tables
#[derive(Debug, Error, PartialEq)]
pub enum LookupError {
    #[error("Table has no rows")]
    EmptyTable,

    #[error("Row {row} has a missing or non-finite value: {value}")]
    NonFiniteValue { row: usize, value: f64 },

    #[error("Row {row} has an empty bin: {reason}")]
    InvalidBin { row: usize, reason: String },

    #[error("Table has sex-specific rows but none for {0:?}")]
    MissingSex(Sex),

    #[error("Input table not found: {0}")]
    MissingTable(String),
}

/// Deterministic `(age, sex, year) → value` query
///
/// Implementations must be total over every cohort the simulation
/// encounters.
pub trait LookupTable: std::fmt::Debug + Send + Sync {
    fn query(&self, age: f64, sex: Sex, year: i32) -> f64;
}

/// Table returning the same value for every query
///
/// # Example
/// ```
/// use mslt_core_rs::lookup::{ConstantTable, LookupTable};
/// use mslt_core_rs::Sex;
///
/// let table = ConstantTable::new(0.25).unwrap();
/// assert_eq!(table.query(40.0, Sex::Male, 2020), 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTable {
    value: f64,
}

impl ConstantTable {
    pub fn new(value: f64) -> Result<Self, LookupError> {
        if !value.is_finite() {
            return Err(LookupError::NonFiniteValue { row: 0, value });
        }
        Ok(Self { value })
    }
}

impl LookupTable for ConstantTable {
    fn query(&self, _age: f64, _sex: Sex, _year: i32) -> f64 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_table_rejects_nan() {
        assert_eq!(
            ConstantTable::new(f64::NAN).unwrap_err().to_string(),
            "Row 0 has a missing or non-finite value: NaN"
        );
    }
}
