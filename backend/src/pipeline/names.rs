//! Pipeline names
//!
//! Aggregate pipelines have fixed names. Disease pipelines are named
//! `<disease>.<measure>` for the BAU track and
//! `<disease>_intervention.<measure>` for the intervention track.

/// Intervention all-cause mortality hazard
pub const MORTALITY_RATE: &str = "mortality_rate";
/// BAU all-cause mortality hazard
pub const BAU_MORTALITY_RATE: &str = "bau_mortality_rate";
/// Intervention disability rate
pub const YLD_RATE: &str = "yld_rate";
/// BAU disability rate
pub const BAU_YLD_RATE: &str = "bau_yld_rate";
/// Intervention per-person health expenditure
pub const HEALTH_COSTS: &str = "health_costs";
/// BAU per-person health expenditure
pub const BAU_HEALTH_COSTS: &str = "bau_health_costs";

pub const INCIDENCE: &str = "incidence";
pub const REMISSION: &str = "remission";
pub const EXCESS_MORTALITY: &str = "excess_mortality";
pub const DISABILITY: &str = "yld_rate";

/// BAU disease pipeline, e.g. `chd.incidence`
pub fn bau(disease: &str, measure: &str) -> String {
    format!("{}.{}", disease, measure)
}

/// Intervention disease pipeline, e.g. `chd_intervention.incidence`
pub fn intervention(disease: &str, measure: &str) -> String {
    format!("{}_intervention.{}", disease, measure)
}
