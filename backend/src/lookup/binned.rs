//! Binned lookup table
//!
//! Rows cover half-open age and year intervals. Queries falling inside no
//! bin resolve to the nearest bin, so the edge bins extend to cover ages
//! and years beyond the data.

use super::{LookupError, LookupTable};
use crate::models::cohort::Sex;
use serde::{Deserialize, Serialize};

fn unbounded_age() -> f64 {
    f64::MAX
}

fn first_year() -> i32 {
    i32::MIN
}

fn last_year() -> i32 {
    i32::MAX
}

/// One bin of a [`BinnedTable`]
///
/// Omitted bounds are unbounded and an omitted sex matches both sexes, so a
/// year-only table (such as a lockdown stage table) only needs
/// `year_start`, `year_end` and `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub age_start: f64,
    #[serde(default = "unbounded_age")]
    pub age_end: f64,
    #[serde(default = "first_year")]
    pub year_start: i32,
    #[serde(default = "last_year")]
    pub year_end: i32,
    pub value: f64,
}

impl TableRow {
    /// Row covering one sex, an age bin and a year bin
    pub fn new(sex: Sex, age: (f64, f64), years: (i32, i32), value: f64) -> Self {
        Self {
            sex: Some(sex),
            age_start: age.0,
            age_end: age.1,
            year_start: years.0,
            year_end: years.1,
            value,
        }
    }

    /// Row covering every age and both sexes for a year bin
    pub fn for_years(year_start: i32, year_end: i32, value: f64) -> Self {
        Self {
            sex: None,
            age_start: 0.0,
            age_end: unbounded_age(),
            year_start,
            year_end,
            value,
        }
    }

    fn matches_sex(&self, sex: Sex) -> bool {
        self.sex.map_or(true, |s| s == sex)
    }

    /// Distance from the query point to this bin; zero when inside
    fn distance(&self, age: f64, year: i32) -> f64 {
        let age_gap = if age < self.age_start {
            self.age_start - age
        } else if age >= self.age_end {
            age - self.age_end + f64::EPSILON
        } else {
            0.0
        };
        let year_gap = if year < self.year_start {
            f64::from(self.year_start) - f64::from(year)
        } else if year >= self.year_end {
            f64::from(year) - f64::from(self.year_end) + 1.0
        } else {
            0.0
        };
        age_gap + year_gap
    }
}

/// Lookup table over age and year bins
///
/// # Example
/// ```
/// use mslt_core_rs::lookup::{BinnedTable, LookupTable, TableRow};
/// use mslt_core_rs::Sex;
///
/// let table = BinnedTable::new(vec![
///     TableRow::new(Sex::Male, (0.0, 50.0), (2011, 2100), 0.01),
///     TableRow::new(Sex::Male, (50.0, 111.0), (2011, 2100), 0.05),
///     TableRow::new(Sex::Female, (0.0, 111.0), (2011, 2100), 0.02),
/// ])
/// .unwrap();
///
/// assert_eq!(table.query(49.9, Sex::Male, 2020), 0.01);
/// assert_eq!(table.query(50.0, Sex::Male, 2020), 0.05);
/// assert_eq!(table.query(30.0, Sex::Female, 2020), 0.02);
/// // Beyond the last age bin the edge bin applies
/// assert_eq!(table.query(115.0, Sex::Male, 2020), 0.05);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedTable {
    rows: Vec<TableRow>,
}

impl BinnedTable {
    /// Build a table, rejecting missing values, empty bins and sex gaps
    pub fn new(rows: Vec<TableRow>) -> Result<Self, LookupError> {
        if rows.is_empty() {
            return Err(LookupError::EmptyTable);
        }

        for (index, row) in rows.iter().enumerate() {
            if !row.value.is_finite() {
                return Err(LookupError::NonFiniteValue {
                    row: index,
                    value: row.value,
                });
            }
            if !(row.age_start < row.age_end) {
                return Err(LookupError::InvalidBin {
                    row: index,
                    reason: format!("age {}..{}", row.age_start, row.age_end),
                });
            }
            if row.year_start >= row.year_end {
                return Err(LookupError::InvalidBin {
                    row: index,
                    reason: format!("year {}..{}", row.year_start, row.year_end),
                });
            }
        }

        for sex in [Sex::Male, Sex::Female] {
            if !rows.iter().any(|row| row.matches_sex(sex)) {
                return Err(LookupError::MissingSex(sex));
            }
        }

        Ok(Self { rows })
    }

    /// Parse rows from a JSON array
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let rows: Vec<TableRow> = serde_json::from_str(json)?;
        Self::new(rows).map_err(serde::de::Error::custom)
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }
}

impl LookupTable for BinnedTable {
    fn query(&self, age: f64, sex: Sex, year: i32) -> f64 {
        let mut best: Option<(&TableRow, f64)> = None;
        for row in self.rows.iter().filter(|row| row.matches_sex(sex)) {
            let distance = row.distance(age, year);
            if distance == 0.0 {
                return row.value;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((row, distance));
            }
        }
        // Construction guarantees at least one row per sex.
        best.map_or(0.0, |(row, _)| row.value)
    }
}
