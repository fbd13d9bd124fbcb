//! Integration tests for the Simulation step loop
//!
//! These tests run complete simulations from configuration and input tables
//! and check the bookkeeping of both tracks.

use chrono::{Datelike, Duration};
use mslt_core_rs::components::{Builder, Component, EvalContext};
use mslt_core_rs::lookup::{ConstantTable, InputTables, PopulationRow};
use mslt_core_rs::orchestrator::{ComponentConfig, Simulation, SimulationConfig, StepResult};
use mslt_core_rs::pipeline::{names, PipelineError};
use mslt_core_rs::{CohortId, SetupError, Sex, SimulationError};
use std::cell::Cell;
use std::rc::Rc;

/// Helper function to create a three-cohort configuration
fn create_config(components: Vec<ComponentConfig>) -> SimulationConfig {
    let mut config = SimulationConfig::from_json(
        r#"{
            "population": { "population_size": 3 },
            "time": { "start": "2011-01-01", "end": "2021-01-01", "step_size": 365 }
        }"#,
    )
    .unwrap();
    config.components = components;
    config
}

/// Helper function to create tables for one chronic and two acute diseases
fn create_tables() -> InputTables {
    let mut tables = InputTables::new();
    let mut constant = |key: &str, value: f64| {
        tables.insert(key, ConstantTable::new(value).unwrap());
    };
    constant("cause.all_causes.mortality", 0.02);
    constant("cause.all_causes.disability_rate", 0.12);
    constant("population.expenditure", 250.0);
    constant("mortality_effects.tobacco", 0.9);
    constant("chronic_disease.chd.incidence", 0.01);
    constant("chronic_disease.chd.remission", 0.0);
    constant("chronic_disease.chd.mortality", 0.08);
    constant("chronic_disease.chd.morbidity", 0.15);
    constant("chronic_disease.chd.prevalence", 0.05);
    constant("acute_disease.road_injury.mortality", 0.001);
    constant("acute_disease.road_injury.morbidity", 0.02);
    constant("acute_disease.covid.mortality", 0.004);
    constant("acute_disease.covid.morbidity", 0.05);

    tables.set_population(vec![
        PopulationRow {
            age: 25.0,
            sex: Sex::Male,
            population: 2_000.0,
        },
        PopulationRow {
            age: 25.0,
            sex: Sex::Female,
            population: 2_100.0,
        },
        PopulationRow {
            age: 80.0,
            sex: Sex::Female,
            population: 900.0,
        },
    ]);
    tables
}

fn chd() -> ComponentConfig {
    ComponentConfig::ChronicDisease {
        name: "chd".to_string(),
        simplified_no_remission_equations: false,
    }
}

fn road_injury() -> ComponentConfig {
    ComponentConfig::AcuteDisease {
        name: "rta".to_string(),
        data_name: Some("road_injury".to_string()),
        no_bau: false,
    }
}

fn run(components: Vec<ComponentConfig>) -> (Simulation, Vec<StepResult>) {
    let mut sim = Simulation::new(&create_config(components), &create_tables()).unwrap();
    let results = sim.run().unwrap();
    (sim, results)
}

/// Counts every modification of the aggregate pipelines
struct CountingComponent {
    calls: Rc<Cell<usize>>,
}

impl Component for CountingComponent {
    fn name(&self) -> &str {
        "counter"
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        builder.register_modifier(names::MORTALITY_RATE);
        builder.register_modifier(names::BAU_MORTALITY_RATE);
        builder.register_modifier(names::YLD_RATE);
        builder.register_modifier(names::BAU_YLD_RATE);
        Ok(())
    }

    fn modify(
        &self,
        _pipeline: &str,
        _cohort: CohortId,
        value: f64,
        _ctx: &EvalContext<'_>,
    ) -> Result<f64, PipelineError> {
        self.calls.set(self.calls.get() + 1);
        Ok(value)
    }
}

/// Registers a second base producer on an aggregate pipeline
struct ShadowMortality;

impl Component for ShadowMortality {
    fn name(&self) -> &str {
        "shadow"
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        let table = builder.load("cause.all_causes.mortality")?;
        builder.register_rate_producer(names::MORTALITY_RATE, table)
    }
}

/// Modifies a pipeline that nothing produces
struct Orphan;

impl Component for Orphan {
    fn name(&self) -> &str {
        "orphan"
    }

    fn setup(&mut self, builder: &mut Builder<'_>) -> Result<(), SetupError> {
        builder.register_modifier("ghost.incidence");
        Ok(())
    }
}

#[test]
fn test_run_covers_every_step() {
    let (sim, results) = run(vec![]);
    assert_eq!(results.len(), sim.clock().total_steps());
    assert!(sim.is_finished());
    for (index, result) in results.iter().enumerate() {
        let elapsed = Duration::days(365 * index as i64);
        assert_eq!(result.step, index);
        assert_eq!(result.date, sim.clock().start() + elapsed);
        assert_eq!(result.year, result.date.year());
    }
    assert_eq!(sim.event_log().events_of_type("StepCompleted").len(), results.len());
}

#[test]
fn test_tracks_identical_without_intervention() {
    let (sim, results) = run(vec![chd(), road_injury()]);

    for result in &results {
        assert_eq!(result.bau, result.intervention);
        assert_eq!(result.haly_gain(), 0.0);
    }
    for cohort in sim.state().cohorts() {
        assert_eq!(cohort.bau, cohort.intervention);
    }
}

#[test]
fn test_aggregate_pipelines_evaluated_once_per_cohort_per_step() {
    let calls = Rc::new(Cell::new(0));
    let counter: Box<dyn Component> = Box::new(CountingComponent {
        calls: Rc::clone(&calls),
    });
    let mut sim =
        Simulation::with_components(&create_config(vec![chd()]), &create_tables(), vec![counter])
            .unwrap();

    let first = sim.step().unwrap();
    assert_eq!(calls.get(), 4 * first.tracked_cohorts);

    let results = sim.run().unwrap();
    let cohort_steps: usize = first.tracked_cohorts
        + results.iter().map(|r| r.tracked_cohorts).sum::<usize>();
    assert_eq!(calls.get(), 4 * cohort_steps);
}

#[test]
fn test_population_bookkeeping() {
    let (sim, results) = run(vec![]);
    let last = results.last().unwrap();

    let population: f64 = sim.state().cohorts().iter().map(|c| c.bau.population).sum();
    assert!((last.bau.population - population).abs() < 1e-9);

    let mut previous = 5_000.0;
    for result in &results {
        assert!(result.bau.population < previous);
        let expected = previous - result.bau.deaths;
        assert!((result.bau.population - expected).abs() < 1e-9);
        previous = result.bau.population;
    }
}

#[test]
fn test_acute_scale_averts_deaths() {
    let (sim, results) = run(vec![
        road_injury(),
        ComponentConfig::AcuteMortalityScale {
            disease: "rta".to_string(),
            scale: 0.5,
        },
    ]);

    for result in &results {
        assert!(result.deaths_averted() > 0.0);
        assert!(result.haly_gain() > 0.0);
    }

    let cohort = sim.state().cohort(0).unwrap();
    let record = sim.state().acute_record("rta", 0).unwrap();
    let ctx = sim.context();
    let rate = ctx.rate("rta_intervention.excess_mortality", 0).unwrap();
    let expected = cohort.intervention.population_at_step_start() * rate;
    assert!((record.deaths - expected).abs() < 1e-9);
    assert!(record.deaths < record.deaths_bau);
}

#[test]
fn test_acute_disease_without_bau() {
    let (sim, results) = run(vec![ComponentConfig::AcuteDisease {
        name: "covid".to_string(),
        data_name: None,
        no_bau: true,
    }]);

    // The disease only exists on the intervention track
    assert!(results.iter().all(|r| r.deaths_averted() < 0.0));
    let record = sim.state().acute_record("covid", 1).unwrap();
    assert!(record.deaths > 0.0);
    assert!(record.haly < 0.0);
    assert_eq!(record.deaths_bau, 0.0);
    assert_eq!(record.haly_bau, 0.0);

    let cohort = sim.state().cohort(1).unwrap();
    let step_covid = 0.004 * sim.clock().years_per_step();
    assert!((cohort.intervention.acmr - cohort.bau.acmr - step_covid).abs() < 1e-15);
}

#[test]
fn test_magic_wand_shifts_halve_rates() {
    let (sim, _) = run(vec![ComponentConfig::MortalityShift, ComponentConfig::YldShift]);
    for cohort in sim.state().cohorts() {
        assert_eq!(cohort.intervention.acmr, cohort.bau.acmr * 0.5);
        assert_eq!(cohort.intervention.yld_rate, cohort.bau.yld_rate * 0.5);
    }
}

#[test]
fn test_mortality_effects_scale_hazard() {
    let (sim, _) = run(vec![ComponentConfig::MortalityEffects {
        name: "tobacco".to_string(),
    }]);
    for cohort in sim.state().cohorts() {
        assert_eq!(cohort.intervention.acmr, cohort.bau.acmr * 0.9);
        assert_eq!(cohort.intervention.yld_rate, cohort.bau.yld_rate);
    }
}

#[test]
fn test_modifiers_compose_in_configured_order() {
    let (sim, _) = run(vec![
        road_injury(),
        ComponentConfig::MortalityShift,
        ComponentConfig::AcuteMortalityScale {
            disease: "rta".to_string(),
            scale: 0.0,
        },
    ]);
    // (base + (0 − rta)) × 0.5
    let cohort = sim.state().cohort(0).unwrap();
    let ctx = sim.context();
    let rta = ctx.rate("rta.excess_mortality", 0).unwrap();
    let expected = (cohort.bau.acmr - rta) * 0.5;
    assert!((cohort.intervention.acmr - expected).abs() < 1e-15);
}

#[test]
fn test_expenditure_follows_population() {
    let (sim, results) = run(vec![ComponentConfig::Expenditure, ComponentConfig::MortalityShift]);

    for cohort in sim.state().cohorts() {
        assert_eq!(cohort.bau.expenditure, cohort.bau.population * 250.0);
        assert_eq!(cohort.intervention.expenditure, cohort.intervention.population * 250.0);
    }
    let last = results.last().unwrap();
    assert!(last.intervention.expenditure > last.bau.expenditure);
}

#[test]
fn test_initialization_event_lists_components() {
    let sim = Simulation::new(&create_config(vec![chd(), road_injury()]), &create_tables()).unwrap();
    assert_eq!(sim.component_names(), vec!["chd", "rta"]);

    let events = sim.event_log().events_of_type("SimulationInitialized");
    assert_eq!(events.len(), 1);
    assert_eq!(
        serde_json::to_value(events[0]).unwrap()["components"],
        serde_json::json!(["chd", "rta"])
    );
}

#[test]
fn test_step_after_finish_is_an_error() {
    let (mut sim, results) = run(vec![]);
    match sim.step() {
        Err(SimulationError::Finished(steps)) => assert_eq!(steps, results.len()),
        other => panic!("expected finished, got {:?}", other),
    }
}

#[test]
fn test_population_size_must_match() {
    let mut config = create_config(vec![]);
    config.population.population_size = 4;
    assert!(matches!(
        Simulation::new(&config, &create_tables()),
        Err(SimulationError::PopulationMismatch {
            expected: 4,
            found: 3
        })
    ));
}

#[test]
fn test_second_base_producer_is_fatal() {
    let result = Simulation::with_components(
        &create_config(vec![]),
        &create_tables(),
        vec![Box::new(ShadowMortality) as Box<dyn Component>],
    );
    assert!(matches!(
        result,
        Err(SimulationError::Setup(SetupError::Pipeline(PipelineError::DuplicateSource(_))))
    ));
}

#[test]
fn test_modifier_without_producer_is_fatal() {
    let result = Simulation::with_components(
        &create_config(vec![]),
        &create_tables(),
        vec![Box::new(Orphan) as Box<dyn Component>],
    );
    assert!(matches!(
        result,
        Err(SimulationError::Pipeline(PipelineError::MissingSource(name))) if name == "ghost.incidence"
    ));
}

#[test]
fn test_step_results_serialize() {
    let (_, results) = run(vec![]);
    let json = serde_json::to_value(&results[0]).unwrap();
    assert_eq!(json["step"], 0);
    assert_eq!(json["date"], "2011-01-01");
    assert!(json["bau"]["haly"].as_f64().unwrap() > 0.0);
}
