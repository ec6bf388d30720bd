//! Integration tests for hiss-config.
//!
//! These tests verify config files, the parameter store and processing
//! chains working together.

use hiss_config::{
    ChainConfig, ConfigError, EngineConfig, ParameterStore, ProcessingChain, ProcessorConfig,
    ProcessorRegistry, RenderSettings,
};
use hiss_core::{ParamValue, ParameterSnapshot, peak};
use proptest::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
[render]
sample_rate = 48000
block_size = 256

[[processors]]
type = "fractal"
params = { octaves = 5, persistence = 0.6 }

[[processors]]
type = "resonant_lowpass"
params = { poles = 4, resonance = 0.9, mapping = "cubic", trend_removal = true }
"#;

/// Load a config from disk, build its chain and render with store values.
#[test]
fn test_config_file_to_rendering() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = EngineConfig::load(&path).expect("config should load");
    assert_eq!(config.render.sample_rate, 48_000);
    assert_eq!(config.processors.len(), 2);

    let registry = ProcessorRegistry::new();
    let store = ParameterStore::from_registry(&registry).unwrap();
    let initial = store
        .apply_initial(&config.processors.initial_values())
        .expect("chain values should validate");
    assert_eq!(initial.int("poles", 0), 4);
    assert_eq!(initial.text("mapping", ""), "cubic");

    let mut chain = ProcessingChain::build(&registry, &config.processors).unwrap();
    for _ in 0..16 {
        let block = chain
            .render_block(config.render.block_size, &store.snapshot())
            .unwrap();
        assert_eq!(block.len(), 256);
        assert!(peak(&block) <= 1.0);
    }
}

/// Saving and loading keeps every setting.
#[test]
fn test_save_and_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.toml");

    let config = EngineConfig {
        render: RenderSettings {
            block_size: 1024,
            device: Some("Speakers".to_string()),
            ..RenderSettings::default()
        },
        processors: ChainConfig::new(vec![ProcessorConfig::new("xorshift").with_param("seed", 99)])
            .then(ProcessorConfig::new("lowpass").with_param("cutoff", 0.3)),
    };
    config.save(&path).unwrap();

    let loaded = EngineConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_reports_path() {
    let err = EngineConfig::load("/nonexistent/hiss.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("/nonexistent/hiss.toml"));
}

#[test]
fn test_empty_file_uses_defaults() {
    let config = EngineConfig::from_toml_str("").unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.render.block_size, 2048);
    assert_eq!(config.render.sample_rate, 44_100);
}

#[test]
fn test_invalid_render_setting_rejected() {
    let err = EngineConfig::from_toml_str("[render]\nblock_size = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSetting { key: "block_size", .. }));
}

#[test]
fn test_malformed_toml_rejected() {
    assert!(matches!(
        EngineConfig::from_toml_str("[[processors]\ntype = "),
        Err(ConfigError::Parse(_))
    ));
}

/// Chain shape errors surface at build time, never while rendering.
#[test]
fn test_chain_shape_errors() {
    let registry = ProcessorRegistry::new();
    let build = |stages: &[&str]| {
        let config = ChainConfig::new(stages.iter().map(|s| ProcessorConfig::new(*s)).collect());
        ProcessingChain::build(&registry, &config)
    };

    assert!(matches!(build(&[]), Err(ConfigError::EmptyChain)));
    assert!(matches!(
        build(&["lowpass"]),
        Err(ConfigError::FirstStageNotGenerator(_))
    ));
    assert!(matches!(
        build(&["fractal", "xorshift"]),
        Err(ConfigError::GeneratorAfterFirst { index: 1, .. })
    ));
    assert!(matches!(
        build(&["xorshift", "phaser"]),
        Err(ConfigError::UnknownProcessor(_))
    ));
}

/// Two chains from the same config render the same samples.
#[test]
fn test_chain_rendering_is_deterministic() {
    let registry = ProcessorRegistry::new();
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let params = ParameterSnapshot::new().with("cutoff", 0.4);

    let mut a = ProcessingChain::build(&registry, &config.processors).unwrap();
    let mut b = ProcessingChain::build(&registry, &config.processors).unwrap();
    for _ in 0..8 {
        assert_eq!(
            a.render_block(128, &params).unwrap(),
            b.render_block(128, &params).unwrap()
        );
    }
}

/// Live updates reach the chain on the next block.
#[test]
fn test_store_updates_change_rendering() {
    let registry = ProcessorRegistry::new();
    let store = ParameterStore::from_registry(&registry).unwrap();
    let config = ChainConfig::new(vec![
        ProcessorConfig::new("xorshift"),
        ProcessorConfig::new("lowpass"),
    ]);
    let mut live = ProcessingChain::build(&registry, &config).unwrap();
    let mut reference = ProcessingChain::build(&registry, &config).unwrap();

    let first = live.render_block(512, &store.snapshot()).unwrap();
    let half = ParameterSnapshot::new().with("volume", 0.5);
    assert_eq!(first, reference.render_block(512, &half).unwrap());

    store.update([("volume", ParamValue::Float(0.25))]).unwrap();
    let quiet = ParameterSnapshot::new().with("volume", 0.25);
    let second = live.render_block(512, &store.snapshot()).unwrap();
    assert_eq!(second, reference.render_block(512, &quiet).unwrap());
}

#[test]
fn test_conflicting_definitions_rejected() {
    use hiss_core::ParameterDefinition;

    let err = ParameterStore::new([
        ParameterDefinition::cutoff(),
        ParameterDefinition::float("cutoff", 0.0, 2.0, 1.0),
    ])
    .unwrap_err();
    assert!(matches!(err, ConfigError::ConflictingParameter(name) if name == "cutoff"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// An update with any rejected entry leaves the snapshot untouched.
    #[test]
    fn rejected_updates_apply_nothing(
        cutoff in 0.0f32..=1.0,
        poles in prop_oneof![-10i64..=0, 5i64..=10],
    ) {
        let store = ParameterStore::from_registry(&ProcessorRegistry::new()).unwrap();
        let before = store.snapshot();

        let result = store.update([
            ("cutoff", ParamValue::Float(cutoff)),
            ("poles", ParamValue::Int(poles)),
        ]);

        prop_assert!(result.is_err());
        prop_assert_eq!(&*store.snapshot(), &*before);
    }

    /// Accepted updates are visible in full.
    #[test]
    fn accepted_updates_apply_everything(
        cutoff in 0.0f32..=1.0,
        resonance in 0.0f32..=1.0,
        poles in 1i64..=4,
    ) {
        let store = ParameterStore::from_registry(&ProcessorRegistry::new()).unwrap();
        store
            .update([
                ("cutoff", ParamValue::Float(cutoff)),
                ("resonance", ParamValue::Float(resonance)),
                ("poles", ParamValue::Int(poles)),
            ])
            .unwrap();

        let snapshot = store.snapshot();
        prop_assert_eq!(snapshot.float("cutoff", -1.0), cutoff);
        prop_assert_eq!(snapshot.float("resonance", -1.0), resonance);
        prop_assert_eq!(snapshot.int("poles", 0), poles);
    }
}
