//! Tests for rate pipelines and the evaluation guard

use chrono::NaiveDate;
use mslt_core_rs::components::{Component, EvalContext};
use mslt_core_rs::lookup::{BinnedTable, ConstantTable, TableRow};
use mslt_core_rs::pipeline::{names, EvaluationGuard, Modifier, PipelineError, PipelineKind, RateRegistry};
use mslt_core_rs::{Cohort, Sex, SimulationClock, SimulationState};

fn clock(step_days: u32) -> SimulationClock {
    SimulationClock::new(
        NaiveDate::from_ymd_opt(2011, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        step_days,
    )
}

fn state() -> SimulationState {
    SimulationState::new(vec![
        Cohort::new(0, 42.0, Sex::Male, 100.0),
        Cohort::new(1, 42.0, Sex::Female, 100.0),
    ])
}

/// Everything an evaluation context borrows, with no components
struct Fixture {
    state: SimulationState,
    clock: SimulationClock,
    components: Vec<Box<dyn Component>>,
}

impl Fixture {
    fn new(step_days: u32) -> Self {
        Self {
            state: state(),
            clock: clock(step_days),
            components: Vec::new(),
        }
    }

    fn ctx<'a>(&'a self, registry: &'a RateRegistry) -> EvalContext<'a> {
        EvalContext {
            registry,
            components: &self.components,
            state: &self.state,
            clock: &self.clock,
        }
    }
}

#[test]
fn test_modifiers_apply_in_registration_order() {
    let mut registry = RateRegistry::new();
    registry
        .register_base("yld_rate", PipelineKind::Value, ConstantTable::new(1.0).unwrap())
        .unwrap();
    registry.register_modifier("yld_rate", Modifier::function("add", |_, v| v + 1.0));
    registry.register_modifier("yld_rate", Modifier::function("double", |_, v| v * 2.0));

    let fixture = Fixture::new(365);
    let ctx = fixture.ctx(&registry);
    assert_eq!(registry.evaluate("yld_rate", 0, &ctx).unwrap(), 4.0);

    let mut reversed = RateRegistry::new();
    reversed
        .register_base("yld_rate", PipelineKind::Value, ConstantTable::new(1.0).unwrap())
        .unwrap();
    reversed.register_modifier("yld_rate", Modifier::function("double", |_, v| v * 2.0));
    reversed.register_modifier("yld_rate", Modifier::function("add", |_, v| v + 1.0));
    let ctx = fixture.ctx(&reversed);
    assert_eq!(reversed.evaluate("yld_rate", 0, &ctx).unwrap(), 3.0);
}

#[test]
fn test_rate_pipelines_are_rescaled_to_the_step() {
    let mut registry = RateRegistry::new();
    registry
        .register_base("mortality_rate", PipelineKind::Rate, ConstantTable::new(0.5).unwrap())
        .unwrap();
    registry
        .register_base("yld_rate", PipelineKind::Value, ConstantTable::new(0.5).unwrap())
        .unwrap();

    let fixture = Fixture::new(1461);
    let ctx = fixture.ctx(&registry);
    assert_eq!(registry.evaluate("mortality_rate", 0, &ctx).unwrap(), 2.0);
    assert_eq!(registry.evaluate("yld_rate", 0, &ctx).unwrap(), 0.5);
}

#[test]
fn test_source_is_queried_by_cohort_sex() {
    let table = BinnedTable::new(vec![
        TableRow::new(Sex::Male, (0.0, 120.0), (2000, 2100), 0.1),
        TableRow::new(Sex::Female, (0.0, 120.0), (2000, 2100), 0.2),
    ])
    .unwrap();
    let mut registry = RateRegistry::new();
    registry
        .register_base("yld_rate", PipelineKind::Value, table)
        .unwrap();

    let fixture = Fixture::new(365);
    let ctx = fixture.ctx(&registry);
    assert_eq!(registry.evaluate("yld_rate", 0, &ctx).unwrap(), 0.1);
    assert_eq!(registry.evaluate("yld_rate", 1, &ctx).unwrap(), 0.2);
}

#[test]
fn test_evaluation_errors() {
    let mut registry = RateRegistry::new();
    registry
        .register_base("yld_rate", PipelineKind::Value, ConstantTable::new(0.1).unwrap())
        .unwrap();
    registry.register_modifier("yld_rate", Modifier::function("nan", |_, _| f64::NAN));
    registry.register_modifier("mortality_rate", Modifier::Component(3));

    let fixture = Fixture::new(365);
    let ctx = fixture.ctx(&registry);

    assert_eq!(
        registry.evaluate("chd.incidence", 0, &ctx),
        Err(PipelineError::UnknownPipeline("chd.incidence".to_string()))
    );
    assert_eq!(
        registry.evaluate("mortality_rate", 0, &ctx),
        Err(PipelineError::MissingSource("mortality_rate".to_string()))
    );
    assert_eq!(
        registry.evaluate("yld_rate", 5, &ctx),
        Err(PipelineError::UnknownCohort(5))
    );
    assert!(matches!(
        registry.evaluate("yld_rate", 0, &ctx),
        Err(PipelineError::NonFinite { cohort: 0, .. })
    ));
}

#[test]
fn test_modifier_referencing_missing_component() {
    let mut registry = RateRegistry::new();
    registry
        .register_base("yld_rate", PipelineKind::Value, ConstantTable::new(0.1).unwrap())
        .unwrap();
    registry.register_modifier("yld_rate", Modifier::Component(0));

    let fixture = Fixture::new(365);
    let ctx = fixture.ctx(&registry);
    assert_eq!(
        registry.evaluate("yld_rate", 0, &ctx),
        Err(PipelineError::UnknownComponent {
            pipeline: "yld_rate".to_string(),
            component: 0,
        })
    );
}

#[test]
fn test_guard_rejects_second_evaluation_in_a_step() {
    let mut guard = EvaluationGuard::new();
    guard.begin_step(4);

    guard.claim("mortality_rate", 0).unwrap();
    guard.claim("mortality_rate", 1).unwrap();
    guard.claim("yld_rate", 0).unwrap();
    assert_eq!(guard.claims(), 3);

    assert_eq!(
        guard.claim("mortality_rate", 1),
        Err(PipelineError::DuplicateEvaluation {
            pipeline: "mortality_rate".to_string(),
            cohort: 1,
            step: 4,
        })
    );

    guard.begin_step(5);
    assert_eq!(guard.claims(), 0);
    assert!(guard.claim("mortality_rate", 1).is_ok());
}

#[test]
fn test_guard_tracks_each_aggregate_name_separately() {
    let aggregates = [
        names::MORTALITY_RATE,
        names::BAU_MORTALITY_RATE,
        names::YLD_RATE,
        names::BAU_YLD_RATE,
    ];
    let mut guard = EvaluationGuard::new();
    guard.begin_step(1);

    for cohort in 0..3 {
        for name in aggregates {
            guard.claim(name, cohort).unwrap();
        }
    }
    assert_eq!(guard.claims(), 12);

    for name in aggregates {
        assert!(matches!(
            guard.claim(name, 2),
            Err(PipelineError::DuplicateEvaluation { ref pipeline, cohort: 2, step: 1 })
                if pipeline == name
        ));
    }
    assert_eq!(guard.claims(), 12);
}
