//! Immutable name → value mapping handed to processors once per block.

use crate::param::{ParamValue, ParameterDefinition};
use std::collections::BTreeMap;

/// A complete set of parameter values.
///
/// Snapshots are never mutated in place: a parameter store builds a new one
/// with [`with_changes`](Self::with_changes) and publishes it whole, so a
/// reader always sees values that belong together.
///
/// Processors read through the typed accessors, which fall back to a
/// caller-supplied value when a key is missing or has another type.
///
/// # Example
///
/// ```rust
/// use hiss_core::{ParameterSnapshot, ParamValue};
///
/// let snapshot = ParameterSnapshot::new()
///     .with("cutoff", 0.3)
///     .with("poles", 2);
///
/// assert_eq!(snapshot.float("cutoff", 0.5), 0.3);
/// assert_eq!(snapshot.int("poles", 1), 2);
/// assert_eq!(snapshot.float("resonance", 0.0), 0.0); // absent, falls back
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSnapshot {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterSnapshot {
    /// Empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot holding the default of every definition.
    pub fn from_defaults<'a>(definitions: impl IntoIterator<Item = &'a ParameterDefinition>) -> Self {
        definitions
            .into_iter()
            .map(|def| (def.name.to_string(), def.default.clone()))
            .collect()
    }

    /// Builder-style insert. Values are stored as given, without validation.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Copy of this snapshot with `changes` applied on top.
    pub fn with_changes(&self, changes: impl IntoIterator<Item = (String, ParamValue)>) -> Self {
        let mut values = self.values.clone();
        values.extend(changes);
        Self { values }
    }

    /// Raw value for `name`.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Whether a value for `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the snapshot holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Float value for `name`, or `fallback`. Integers are widened.
    #[inline]
    pub fn float(&self, name: &str, fallback: f32) -> f32 {
        self.get(name).and_then(ParamValue::as_f32).unwrap_or(fallback)
    }

    /// Integer value for `name`, or `fallback`.
    #[inline]
    pub fn int(&self, name: &str, fallback: i64) -> i64 {
        self.get(name).and_then(ParamValue::as_int).unwrap_or(fallback)
    }

    /// Boolean value for `name`, or `fallback`.
    #[inline]
    pub fn boolean(&self, name: &str, fallback: bool) -> bool {
        self.get(name).and_then(ParamValue::as_bool).unwrap_or(fallback)
    }

    /// Text value for `name`, or `fallback`.
    #[inline]
    pub fn text<'a>(&'a self, name: &str, fallback: &'a str) -> &'a str {
        self.get(name).and_then(ParamValue::as_str).unwrap_or(fallback)
    }
}

impl FromIterator<(String, ParamValue)> for ParameterSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
