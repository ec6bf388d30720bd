//! Engine configuration types and TOML loading.
//!
//! ```toml
//! [render]
//! sample_rate = 44100
//! block_size = 2048
//!
//! [[processors]]
//! type = "xorshift"
//! params = { seed = 12345 }
//!
//! [[processors]]
//! type = "bandpass"
//! params = { cutoff = 0.5, bandwidth = 0.5 }
//! ```

use crate::error::ConfigError;
use hiss_core::{ParamType, ParamValue, ParameterDefinition, ParameterSnapshot, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// A parameter value as written in a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    /// `true` / `false`
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// Quoted string (text and enum parameters).
    Text(String),
}

impl ConfigValue {
    /// Convert to a parameter value. Floats narrow to `f32`.
    pub fn to_param(&self) -> ParamValue {
        match self {
            ConfigValue::Bool(v) => ParamValue::Bool(*v),
            ConfigValue::Int(v) => ParamValue::Int(*v),
            ConfigValue::Float(v) => ParamValue::Float(*v as f32),
            ConfigValue::Text(v) => ParamValue::Text(v.clone()),
        }
    }
}

impl From<&ParamValue> for ConfigValue {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Bool(v) => ConfigValue::Bool(*v),
            ParamValue::Int(v) => ConfigValue::Int(*v),
            // shortest decimal form, so 0.3f32 is written as 0.3
            ParamValue::Float(v) => {
                ConfigValue::Float(v.to_string().parse().unwrap_or(f64::from(*v)))
            }
            ParamValue::Text(v) => ConfigValue::Text(v.clone()),
        }
    }
}

macro_rules! config_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for ConfigValue {
            fn from(v: $ty) -> Self {
                ConfigValue::$variant(v.into())
            }
        })*
    };
}

config_value_from!(
    bool => Bool,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    f32 => Float,
    String => Text,
    &str => Text,
);

/// One stage of a processing chain: a registry id plus creation overrides.
///
/// # Example
///
/// ```rust
/// use hiss_config::ProcessorConfig;
///
/// let config = ProcessorConfig::new("lowpass")
///     .with_param("poles", 3)
///     .with_param("cutoff", 0.2);
///
/// assert_eq!(config.kind, "lowpass");
/// assert_eq!(config.overrides().int("poles", 1), 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessorConfig {
    /// Registry id (e.g. "xorshift", "bandpass").
    #[serde(rename = "type")]
    pub kind: String,

    /// Creation overrides, validated against the processor's schema.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ConfigValue>,
}

impl ProcessorConfig {
    /// Create a stage with no overrides.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add an override.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Overrides as a parameter snapshot.
    pub fn overrides(&self) -> ParameterSnapshot {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_param()))
            .collect()
    }
}

/// Ordered list of chain stages.
///
/// The default is the reference chain `xorshift → bandpass`.
///
/// All stages share one parameter namespace: a `volume` override on any
/// stage sets the `volume` every stage reads. When two stages override the
/// same name the later stage wins and a warning is logged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ChainConfig {
    /// Stages in processing order; the first must be a noise source.
    pub processors: Vec<ProcessorConfig>,
}

impl ChainConfig {
    /// Create a chain configuration from stages.
    pub fn new(processors: Vec<ProcessorConfig>) -> Self {
        Self { processors }
    }

    /// Append a stage.
    pub fn then(mut self, stage: ProcessorConfig) -> Self {
        self.processors.push(stage);
        self
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether there are no stages.
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Iterate over stages in order.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessorConfig> {
        self.processors.iter()
    }

    /// Every stage's overrides, later stages winning on shared names.
    pub fn initial_values(&self) -> ParameterSnapshot {
        for name in self.shared_overrides() {
            tracing::warn!(
                param = %name,
                "parameter overridden by more than one stage, the last one wins"
            );
        }
        self.iter()
            .flat_map(|stage| stage.params.iter())
            .map(|(k, v)| (k.clone(), v.to_param()))
            .collect()
    }

    /// Override names set by more than one stage, in name order.
    pub fn shared_overrides(&self) -> Vec<&str> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for name in self.iter().flat_map(|stage| stage.params.keys()) {
            *seen.entry(name.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(name, _)| name)
            .collect()
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::new(vec![
            ProcessorConfig::new("xorshift"),
            ProcessorConfig::new("bandpass"),
        ])
    }
}

/// Render thread and device settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Frames per rendered block.
    pub block_size: usize,
    /// Output channels; the mono block is copied to each.
    pub channels: u16,
    /// Upper bound on how long `stop` waits for the render thread.
    pub stop_timeout_ms: u64,
    /// Output device name; `None` selects the system default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl RenderSettings {
    /// Stop timeout as a duration.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Wall-clock length of one block.
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / f64::from(self.sample_rate.max(1)))
    }

    /// Number of frames in `seconds` of audio.
    pub fn frames_for(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * f64::from(self.sample_rate)).round() as u64
    }

    /// Reject settings the render thread cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key, reason: &str| {
            Err(ConfigError::InvalidSetting {
                key,
                reason: reason.to_string(),
            })
        };
        if !(8_000..=384_000).contains(&self.sample_rate) {
            return invalid("sample_rate", "expected 8000 to 384000 Hz");
        }
        if !(1..=65_536).contains(&self.block_size) {
            return invalid("block_size", "expected 1 to 65536 frames");
        }
        if !(1..=32).contains(&self.channels) {
            return invalid("channels", "expected 1 to 32 channels");
        }
        if self.stop_timeout_ms == 0 {
            return invalid("stop_timeout_ms", "must be greater than zero");
        }
        Ok(())
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 2048,
            channels: 1,
            stop_timeout_ms: 1000,
            device: None,
        }
    }
}

/// Complete engine configuration.
///
/// Missing sections fall back to their defaults, so an empty file yields
/// 44.1 kHz, 2048-frame blocks and the `xorshift → bandpass` chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Render settings.
    #[serde(default)]
    pub render: RenderSettings,

    /// Chain stages.
    #[serde(default)]
    pub processors: ChainConfig,
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), stages = config.processors.len(), "config loaded");
        Ok(config)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.render.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::io(path, e))
    }
}

/// Split a `name=value` assignment.
pub fn parse_assignment(assignment: &str) -> Option<(&str, &str)> {
    let (name, value) = assignment.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some((name, value.trim()))
}

/// Parse a textual value for the parameter `def` and validate it.
///
/// Supports:
/// - Floats: "0.5", "-0.3", "50%" (divided by 100)
/// - Ints: "3"
/// - Bools: "true"/"false", "on"/"off", "yes"/"no", "1"/"0"
/// - Strings and enums: taken verbatim
pub fn parse_param_value(
    raw: &str,
    def: &ParameterDefinition,
) -> Result<ParamValue, ValidationError> {
    let raw = raw.trim();
    let mismatch = || ValidationError::TypeMismatch {
        param: def.name.to_string(),
        expected: def.param_type,
        found: ParamType::String,
    };

    let value = match def.param_type {
        ParamType::Float => {
            let parsed = match raw.strip_suffix('%') {
                Some(pct) => pct.trim().parse::<f32>().map(|v| v / 100.0),
                None => raw.parse::<f32>(),
            };
            ParamValue::Float(parsed.map_err(|_| mismatch())?)
        }
        ParamType::Int => ParamValue::Int(raw.parse().map_err(|_| mismatch())?),
        ParamType::Bool => ParamValue::Bool(match raw.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => true,
            "false" | "off" | "no" | "0" => false,
            _ => return Err(mismatch()),
        }),
        ParamType::String | ParamType::Enum => ParamValue::Text(raw.to_string()),
    };
    def.validate(&value)
}
