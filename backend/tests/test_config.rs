//! Tests for configuration parsing and validation

use mslt_core_rs::orchestrator::{ComponentConfig, ConfigError, SimulationConfig};

const BASE: &str = r#"{
    "population": { "population_size": 44 },
    "time": { "start": "2011-01-01", "end": "2120-01-01", "step_size": 365 },
    "components": []
}"#;

fn with_components(json: &str) -> Result<SimulationConfig, ConfigError> {
    let mut config = SimulationConfig::from_json(BASE)?;
    config.components = serde_json::from_str(json)?;
    Ok(config)
}

#[test]
fn test_defaults() {
    let config = SimulationConfig::from_json(BASE).unwrap();
    assert_eq!(config.population.max_age, 110.0);
    assert_eq!(config.time.step_size, 365);
    assert!(config.components.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn test_every_component_kind_parses() {
    let config = with_components(
        r#"[
            { "type": "chronic_disease", "name": "chd", "simplified_no_remission_equations": true },
            { "type": "acute_disease", "name": "rta", "data_name": "road_injury" },
            { "type": "acute_disease", "name": "covid", "no_bau": true },
            { "type": "mortality_effects", "name": "tobacco" },
            { "type": "lockdown", "data_name": "nz", "mortality": { "covid": 0.4 }, "morbidity": { "rta": 0.8 } },
            { "type": "mortality_shift" },
            { "type": "yld_shift" },
            { "type": "incidence_shift", "disease": "chd" },
            { "type": "acute_mortality_scale", "disease": "rta", "scale": 0.9 },
            { "type": "acute_yld_scale", "disease": "covid", "scale": 1.1 },
            { "type": "expenditure" }
        ]"#,
    )
    .unwrap();

    assert_eq!(config.components.len(), 11);
    assert!(config.validate().is_ok());
    assert_eq!(
        config.components[1],
        ComponentConfig::AcuteDisease {
            name: "rta".to_string(),
            data_name: Some("road_injury".to_string()),
            no_bau: false,
        }
    );
    assert_eq!(
        config.components[7],
        ComponentConfig::IncidenceShift {
            disease: "chd".to_string(),
            rate_reduce: None,
        }
    );

    let names: Vec<String> = config.components.iter().map(|c| c.name()).collect();
    assert_eq!(names[3], "tobacco_mort_effects");
    assert_eq!(names[7], "chd_incidence_shift");
    assert_eq!(names[9], "covid_yld_scale");
}

#[test]
fn test_round_trips_through_json() {
    let config = with_components(r#"[{ "type": "chronic_disease", "name": "stroke" }]"#).unwrap();
    let json = serde_json::to_string(&config).unwrap();
    assert_eq!(SimulationConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_unknown_component_type_fails_to_parse() {
    assert!(matches!(
        with_components(r#"[{ "type": "teleport" }]"#),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_negative_acute_scale_is_rejected() {
    let config = with_components(
        r#"[
            { "type": "acute_disease", "name": "rta" },
            { "type": "acute_mortality_scale", "disease": "rta", "scale": -0.1 }
        ]"#,
    )
    .unwrap();
    match config.validate() {
        Err(ConfigError::InvalidScale {
            component,
            measure,
            scale,
        }) => {
            assert_eq!(component, "rta_mortality_scale");
            assert_eq!(measure, "mortality");
            assert_eq!(scale, -0.1);
        }
        other => panic!("expected invalid scale, got {:?}", other),
    }
}

#[test]
fn test_rate_reduce_above_one_is_rejected() {
    let config = with_components(
        r#"[
            { "type": "chronic_disease", "name": "chd" },
            { "type": "incidence_shift", "disease": "chd", "rate_reduce": 1.5 }
        ]"#,
    )
    .unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidScale { .. })));
}

#[test]
fn test_incidence_shift_requires_chronic_disease() {
    let config = with_components(
        r#"[
            { "type": "acute_disease", "name": "chd" },
            { "type": "incidence_shift", "disease": "chd" }
        ]"#,
    )
    .unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::UnknownDisease { kind: "chronic", .. })
    ));
}

#[test]
fn test_lockdown_requires_acute_disease() {
    let config = with_components(
        r#"[{ "type": "lockdown", "data_name": "nz", "mortality": { "covid": 0.4 } }]"#,
    )
    .unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::UnknownDisease { disease, .. }) if disease == "covid"
    ));
}

#[test]
fn test_time_rules() {
    let mut config = SimulationConfig::from_json(BASE).unwrap();
    config.time.step_size = 0;
    assert!(matches!(config.validate(), Err(ConfigError::ZeroStepSize)));

    let mut config = SimulationConfig::from_json(BASE).unwrap();
    std::mem::swap(&mut config.time.start, &mut config.time.end);
    assert!(matches!(config.validate(), Err(ConfigError::EmptyPeriod { .. })));
}

#[test]
fn test_population_rules() {
    let mut config = SimulationConfig::from_json(BASE).unwrap();
    config.population.population_size = 0;
    assert!(matches!(config.validate(), Err(ConfigError::EmptyPopulation)));

    let mut config = SimulationConfig::from_json(BASE).unwrap();
    config.population.max_age = f64::NAN;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxAge(_))));
}
