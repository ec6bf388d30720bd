//! Typed parameter definitions for discoverable processor parameters.
//!
//! Every processor declares its parameters as a list of [`ParameterDefinition`]s.
//! A definition carries everything needed to validate a value and to build a
//! control for it:
//!
//! - [`ParamType`]: float, int, bool, string, or enum
//! - [`ParamRange`]: optional inclusive numeric bounds
//! - `choices`: the allowed set for enum parameters
//! - `default`: must satisfy the definition's own constraints (see [`ParameterDefinition::check`])
//! - display metadata (`display_name`, `description`, `step`), advisory only
//!
//! # Example
//!
//! ```rust
//! use hiss_core::{ParameterDefinition, ParamValue};
//!
//! let cutoff = ParameterDefinition::float("cutoff", 0.0, 1.0, 0.5)
//!     .with_display("Filter Cutoff");
//!
//! assert!(cutoff.check().is_ok());
//! assert_eq!(cutoff.validate(&ParamValue::Float(0.25)).unwrap(), ParamValue::Float(0.25));
//! assert!(cutoff.validate(&ParamValue::Float(1.5)).is_err());
//!
//! // Integers are widened for float parameters
//! assert_eq!(cutoff.validate(&ParamValue::Int(1)).unwrap(), ParamValue::Float(1.0));
//! ```

use crate::error::{ValidationError, ValidationResult};
use std::fmt;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// 32-bit float value.
    Float,
    /// Signed integer value.
    Int,
    /// Boolean switch.
    Bool,
    /// Free-form text.
    String,
    /// One of a fixed set of strings.
    Enum,
}

impl ParamType {
    /// Lowercase name used in messages and listings.
    pub const fn name(&self) -> &'static str {
        match self {
            ParamType::Float => "float",
            ParamType::Int => "int",
            ParamType::Bool => "bool",
            ParamType::String => "string",
            ParamType::Enum => "enum",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parameter value.
///
/// Enum parameters carry their selection as [`ParamValue::Text`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Float value.
    Float(f32),
    /// Integer value.
    Int(i64),
    /// Boolean value.
    Bool(bool),
    /// String or enum value.
    Text(String),
}

impl ParamValue {
    /// The type this value would have if taken literally.
    ///
    /// Text values report [`ParamType::String`]; whether they are a valid
    /// enum selection depends on the definition they are checked against.
    pub const fn param_type(&self) -> ParamType {
        match self {
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Int(_) => ParamType::Int,
            ParamValue::Bool(_) => ParamType::Bool,
            ParamValue::Text(_) => ParamType::String,
        }
    }

    /// Numeric view of the value. Integers are widened.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Integer view of the value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Boolean view of the value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            _ => None,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(f64::from(*v)),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v as f32)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    /// Minimum allowed value.
    pub min: f64,
    /// Maximum allowed value.
    pub max: f64,
}

impl ParamRange {
    /// Create a range from its bounds.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the bounds. NaN is never contained.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Describes one named, typed parameter.
///
/// Definitions are built once when a processor is registered and are
/// read-only afterwards. Names are the unique key within a parameter store.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    /// Unique key (e.g. `"cutoff"`).
    pub name: &'static str,

    /// Declared value type.
    pub param_type: ParamType,

    /// Inclusive bounds for float and int parameters.
    pub range: Option<ParamRange>,

    /// Allowed values for enum parameters; empty for every other type.
    pub choices: &'static [&'static str],

    /// Value used when nothing else was supplied.
    pub default: ParamValue,

    /// Label for control surfaces.
    pub display_name: &'static str,

    /// One-line description for listings.
    pub description: &'static str,

    /// Recommended increment for slider or encoder control.
    pub step: f64,
}

impl ParameterDefinition {
    fn base(name: &'static str, param_type: ParamType, default: ParamValue) -> Self {
        Self {
            name,
            param_type,
            range: None,
            choices: &[],
            default,
            display_name: name,
            description: "",
            step: 0.0,
        }
    }

    /// Float parameter bounded to `[min, max]`.
    pub fn float(name: &'static str, min: f32, max: f32, default: f32) -> Self {
        let mut def = Self::base(name, ParamType::Float, ParamValue::Float(default));
        def.range = Some(ParamRange::new(f64::from(min), f64::from(max)));
        def.step = 0.01;
        def
    }

    /// Integer parameter bounded to `[min, max]`.
    pub fn int(name: &'static str, min: i64, max: i64, default: i64) -> Self {
        let mut def = Self::base(name, ParamType::Int, ParamValue::Int(default));
        def.range = Some(ParamRange::new(min as f64, max as f64));
        def.step = 1.0;
        def
    }

    /// Boolean switch.
    pub fn boolean(name: &'static str, default: bool) -> Self {
        Self::base(name, ParamType::Bool, ParamValue::Bool(default))
    }

    /// Free-form text parameter.
    pub fn string(name: &'static str, default: &str) -> Self {
        Self::base(name, ParamType::String, ParamValue::Text(default.to_string()))
    }

    /// Enum parameter restricted to `choices`.
    pub fn enumeration(
        name: &'static str,
        choices: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        let mut def = Self::base(name, ParamType::Enum, ParamValue::Text(default.to_string()));
        def.choices = choices;
        def
    }

    /// Set the control-surface label.
    pub fn with_display(mut self, display_name: &'static str) -> Self {
        self.display_name = display_name;
        self
    }

    /// Set the listing description.
    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Set the recommended control increment.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Output level (0–1, default 0.5).
    pub fn volume() -> Self {
        Self::float("volume", 0.0, 1.0, 0.5)
            .with_display("Volume")
            .with_description("Output level")
    }

    /// Normalized filter cutoff (0–1, default 0.5).
    pub fn cutoff() -> Self {
        Self::float("cutoff", 0.0, 1.0, 0.5)
            .with_display("Filter Cutoff")
            .with_description("Normalized cutoff, mapped to a one-pole coefficient")
    }

    /// Filter resonance (0–1, default 0).
    pub fn resonance() -> Self {
        Self::float("resonance", 0.0, 1.0, 0.0)
            .with_display("Resonance")
            .with_description("Feedback amount around the final pole")
    }

    /// Bandpass width (0–1, default 0.5).
    pub fn bandwidth() -> Self {
        Self::float("bandwidth", 0.0, 1.0, 0.5)
            .with_display("Bandwidth")
            .with_description("Spread between the high-pass and low-pass corners")
    }

    /// Number of cascaded one-pole stages (1–4, default 1).
    pub fn poles() -> Self {
        Self::int("poles", 1, 4, 1)
            .with_display("Filter Poles")
            .with_description("Cascaded one-pole stages, 6 dB/oct each")
    }

    /// Seed for the xorshift state (full `u32` range, default 12345).
    pub fn seed() -> Self {
        Self::int("seed", 0, i64::from(u32::MAX), 12345)
            .with_display("Seed")
            .with_description("Initial generator state, read once at construction")
    }

    /// Validate `value` against this definition.
    ///
    /// Returns the value in its canonical form: integers supplied for a float
    /// parameter come back as [`ParamValue::Float`]. Floats are never accepted
    /// for integer parameters.
    pub fn validate(&self, value: &ParamValue) -> ValidationResult<ParamValue> {
        let mismatch = || ValidationError::TypeMismatch {
            param: self.name.to_string(),
            expected: self.param_type,
            found: value.param_type(),
        };

        let canonical = match (self.param_type, value) {
            (ParamType::Float, ParamValue::Float(_) | ParamValue::Int(_)) => {
                ParamValue::Float(value.as_f32().ok_or_else(mismatch)?)
            }
            (ParamType::Int, ParamValue::Int(_))
            | (ParamType::Bool, ParamValue::Bool(_))
            | (ParamType::String, ParamValue::Text(_)) => value.clone(),
            (ParamType::Enum, ParamValue::Text(selection)) => {
                if !self.choices.contains(&selection.as_str()) {
                    return Err(ValidationError::InvalidEnum {
                        param: self.name.to_string(),
                        value: selection.clone(),
                        allowed: self.choices.iter().map(|c| (*c).to_string()).collect(),
                    });
                }
                value.clone()
            }
            _ => return Err(mismatch()),
        };

        if let (Some(range), Some(v)) = (self.range, canonical.numeric())
            && !range.contains(v)
        {
            return Err(ValidationError::OutOfRange {
                param: self.name.to_string(),
                value: v,
                min: range.min,
                max: range.max,
            });
        }

        Ok(canonical)
    }

    /// Check the definition against its own constraints.
    ///
    /// Fails when the name is empty, the range is inverted or not finite,
    /// an enum has no choices, or the default does not validate.
    pub fn check(&self) -> ValidationResult<()> {
        let invalid = |reason: &str| ValidationError::InvalidDefinition {
            param: self.name.to_string(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if let Some(range) = self.range
            && !(range.min.is_finite() && range.max.is_finite() && range.min <= range.max)
        {
            return Err(invalid("range bounds must be finite with min <= max"));
        }
        if self.param_type == ParamType::Enum && self.choices.is_empty() {
            return Err(invalid("enum has no choices"));
        }
        self.validate(&self.default)
            .map(|_| ())
            .map_err(|e| invalid(&format!("default rejected: {e}")))
    }
}
