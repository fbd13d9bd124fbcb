//! Input table registry
//!
//! Collects the tables and population structure produced by the external
//! data-loading layer, keyed the way components request them at setup.

use super::{LookupError, LookupTable};
use crate::models::cohort::Sex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Initial head count of one cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRow {
    pub age: f64,
    pub sex: Sex,
    pub population: f64,
}

/// Keyed collection of lookup tables plus the population structure
///
/// # Example
/// ```
/// use mslt_core_rs::lookup::{ConstantTable, InputTables};
///
/// let mut tables = InputTables::new();
/// tables.insert("cause.all_causes.mortality", ConstantTable::new(0.01).unwrap());
///
/// assert!(tables.get("cause.all_causes.mortality").is_ok());
/// assert!(tables.get("cause.all_causes.disability_rate").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InputTables {
    tables: BTreeMap<String, Arc<dyn LookupTable>>,
    population: Vec<PopulationRow>,
}

impl InputTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table under a key, replacing any previous table
    pub fn insert(&mut self, key: impl Into<String>, table: impl LookupTable + 'static) {
        self.tables.insert(key.into(), Arc::new(table));
    }

    /// Register an already shared table under a key
    pub fn insert_shared(&mut self, key: impl Into<String>, table: Arc<dyn LookupTable>) {
        self.tables.insert(key.into(), table);
    }

    /// Fetch a table by key
    pub fn get(&self, key: &str) -> Result<Arc<dyn LookupTable>, LookupError> {
        self.tables
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::MissingTable(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tables.contains_key(key)
    }

    /// Registered keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn set_population(&mut self, rows: Vec<PopulationRow>) {
        self.population = rows;
    }

    pub fn population(&self) -> &[PopulationRow] {
        &self.population
    }
}
