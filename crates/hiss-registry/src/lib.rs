//! Processor registry and factory for hiss noise sources and filters.
//!
//! This crate provides an explicit registry for discovering and instantiating
//! processors by identifier. A registry is built once at startup and handed
//! by reference to whatever builds chains; there is no global instance.
//!
//! # Features
//!
//! - **Processor Discovery**: List all processors, or those in one category
//! - **Factory Pattern**: Create processors by id with validated overrides
//! - **Schemas**: Every processor declares its [`ParameterDefinition`]s
//! - **Aliases**: Alternate ids that resolve to a registered processor
//!
//! # Example
//!
//! ```rust
//! use hiss_core::{ParameterSnapshot, ProcessorCategory};
//! use hiss_registry::ProcessorRegistry;
//!
//! let registry = ProcessorRegistry::new();
//!
//! for processor in registry.by_category(ProcessorCategory::Filter) {
//!     println!("{}: {}", processor.id, processor.description);
//! }
//!
//! let overrides = ParameterSnapshot::new().with("poles", 2);
//! let lowpass = registry.create("lowpass", &overrides).unwrap();
//! assert_eq!(lowpass.category(), ProcessorCategory::Filter);
//!
//! let bad = ParameterSnapshot::new().with("poles", 9);
//! assert!(registry.create("lowpass", &bad).is_err());
//! ```

use hiss_core::{
    FilterStage, NoiseSource, ParameterDefinition, ParameterSnapshot, Processor,
    ProcessorCategory, ValidationError,
};
use hiss_effects::{Bandpass, CascadedLowPass, FeedbackPolicy, FractalNoise, XorShiftNoise};
use std::fmt;
use thiserror::Error;

/// Errors raised while registering or creating processors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    /// An id (or alias) is already taken.
    #[error("processor '{0}' is already registered")]
    DuplicateProcessor(String),

    /// No processor or alias matches the id.
    #[error("unknown processor '{0}'")]
    UnknownProcessor(String),

    /// Declared category and constructor kind disagree.
    #[error("processor '{id}' is declared as {declared} but constructs a {constructed} processor")]
    CategoryMismatch {
        /// Processor id.
        id: String,
        /// Category in the descriptor.
        declared: ProcessorCategory,
        /// Category the factory builds.
        constructed: ProcessorCategory,
    },

    /// A parameter definition in the schema is invalid.
    #[error("invalid schema for processor '{id}': {source}")]
    InvalidSchema {
        /// Processor id.
        id: String,
        /// What is wrong with the schema.
        source: ValidationError,
    },

    /// Creation overrides failed validation.
    #[error("invalid parameters for processor '{id}': {source}")]
    Validation {
        /// Processor id.
        id: String,
        /// Why the overrides were rejected.
        source: ValidationError,
    },
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Constructor for a processor, tagged with the kind it builds.
///
/// Constructors receive the schema defaults merged with the creation
/// overrides, already validated.
#[derive(Clone, Copy)]
pub enum ProcessorFactory {
    /// Builds a chain head.
    Noise(fn(&ParameterSnapshot) -> Box<dyn NoiseSource>),
    /// Builds a filter stage.
    Filter(fn(&ParameterSnapshot) -> Box<dyn FilterStage>),
}

impl ProcessorFactory {
    /// Category of the processors this factory builds.
    pub const fn category(&self) -> ProcessorCategory {
        match self {
            ProcessorFactory::Noise(_) => ProcessorCategory::Noise,
            ProcessorFactory::Filter(_) => ProcessorCategory::Filter,
        }
    }

    /// Run the constructor.
    pub fn build(&self, params: &ParameterSnapshot) -> Processor {
        match self {
            ProcessorFactory::Noise(make) => Processor::Noise(make(params)),
            ProcessorFactory::Filter(make) => Processor::Filter(make(params)),
        }
    }
}

impl fmt::Debug for ProcessorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessorFactory::{:?}", self.category())
    }
}

/// Describes a processor in the registry.
#[derive(Debug, Clone)]
pub struct ProcessorDescriptor {
    /// Unique identifier (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Chain role.
    pub category: ProcessorCategory,
    /// Parameters the processor reads.
    pub params: Vec<ParameterDefinition>,
}

impl ProcessorDescriptor {
    /// Look up one parameter definition by name.
    pub fn param(&self, name: &str) -> Option<&ParameterDefinition> {
        self.params.iter().find(|def| def.name == name)
    }

    /// Snapshot holding every parameter at its default.
    pub fn defaults(&self) -> ParameterSnapshot {
        ParameterSnapshot::from_defaults(&self.params)
    }

    /// Validate `overrides` against this schema and merge them over the defaults.
    ///
    /// Every override is checked; all failures are reported together.
    pub fn resolve(
        &self,
        overrides: &ParameterSnapshot,
    ) -> std::result::Result<ParameterSnapshot, ValidationError> {
        let mut accepted = Vec::with_capacity(overrides.len());
        let mut errors = Vec::new();

        for (name, value) in overrides.iter() {
            match self.param(name) {
                Some(def) => match def.validate(value) {
                    Ok(canonical) => accepted.push((name.to_string(), canonical)),
                    Err(err) => errors.push(err),
                },
                None => errors.push(ValidationError::UnknownParameter(name.to_string())),
            }
        }

        match ValidationError::from_list(errors) {
            Some(err) => Err(err),
            None => Ok(self.defaults().with_changes(accepted)),
        }
    }
}

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: ProcessorDescriptor,
    factory: ProcessorFactory,
}

/// Registry of available processors.
///
/// [`new`](Self::new) registers the built-ins; [`empty`](Self::empty)
/// starts bare. Registration happens at startup; afterwards the registry is
/// only read.
pub struct ProcessorRegistry {
    entries: Vec<RegistryEntry>,
    aliases: Vec<(&'static str, &'static str)>,
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("ids", &self.ids())
            .field("aliases", &self.aliases)
            .finish()
    }
}

impl ProcessorRegistry {
    /// Create a registry with all built-in processors registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(5),
            aliases: Vec::new(),
        };
        registry.register_builtin_processors();
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            aliases: Vec::new(),
        }
    }

    /// Register all built-in processors.
    fn register_builtin_processors(&mut self) {
        let builtins = [
            (
                ProcessorDescriptor {
                    id: "xorshift",
                    name: "XorShift Noise",
                    description: "Seeded 32-bit xorshift white noise",
                    category: ProcessorCategory::Noise,
                    params: XorShiftNoise::parameters(),
                },
                ProcessorFactory::Noise(|p| Box::new(XorShiftNoise::from_params(p))),
            ),
            (
                ProcessorDescriptor {
                    id: "fractal",
                    name: "Fractal Noise",
                    description: "Multi-octave noise with persistence and lacunarity",
                    category: ProcessorCategory::Noise,
                    params: FractalNoise::parameters(),
                },
                ProcessorFactory::Noise(|p| Box::new(FractalNoise::from_params(p))),
            ),
            (
                ProcessorDescriptor {
                    id: "bandpass",
                    name: "Bandpass",
                    description: "One-pole high-pass into one-pole low-pass band filter",
                    category: ProcessorCategory::Filter,
                    params: Bandpass::parameters(),
                },
                ProcessorFactory::Filter(|p| Box::new(Bandpass::from_params(p))),
            ),
            (
                ProcessorDescriptor {
                    id: "lowpass",
                    name: "Low Pass",
                    description: "1-4 cascaded one-pole low-pass stages with final-pole feedback",
                    category: ProcessorCategory::Filter,
                    params: CascadedLowPass::parameters(FeedbackPolicy::Plain),
                },
                ProcessorFactory::Filter(|p| {
                    Box::new(CascadedLowPass::from_params(FeedbackPolicy::Plain, p))
                }),
            ),
            (
                ProcessorDescriptor {
                    id: "resonant_lowpass",
                    name: "Resonant Low Pass",
                    description: "Self-oscillating ladder of 1-4 one-pole low-pass stages",
                    category: ProcessorCategory::Filter,
                    params: CascadedLowPass::parameters(FeedbackPolicy::SelfOscillating),
                },
                ProcessorFactory::Filter(|p| {
                    Box::new(CascadedLowPass::from_params(
                        FeedbackPolicy::SelfOscillating,
                        p,
                    ))
                }),
            ),
        ];

        for (descriptor, factory) in builtins {
            if let Err(err) = self.register(descriptor, factory) {
                tracing::error!(%err, "built-in processor rejected");
            }
        }
        if let Err(err) = self.register_alias("noise", "xorshift") {
            tracing::error!(%err, "built-in alias rejected");
        }
    }

    /// Register a processor.
    ///
    /// Fails when the id is taken, the schema is invalid (a definition fails
    /// its own checks or a name repeats), or the factory builds a different
    /// category than the descriptor declares.
    pub fn register(
        &mut self,
        descriptor: ProcessorDescriptor,
        factory: ProcessorFactory,
    ) -> Result<()> {
        let id = descriptor.id;
        if self.resolve_id(id).is_some() {
            return Err(RegistryError::DuplicateProcessor(id.to_string()));
        }
        if factory.category() != descriptor.category {
            return Err(RegistryError::CategoryMismatch {
                id: id.to_string(),
                declared: descriptor.category,
                constructed: factory.category(),
            });
        }

        let schema_error = |source| RegistryError::InvalidSchema {
            id: id.to_string(),
            source,
        };
        for (i, def) in descriptor.params.iter().enumerate() {
            def.check().map_err(schema_error)?;
            if descriptor.params[..i].iter().any(|d| d.name == def.name) {
                return Err(schema_error(ValidationError::InvalidDefinition {
                    param: def.name.to_string(),
                    reason: "declared more than once".to_string(),
                }));
            }
        }

        tracing::debug!(
            processor = id,
            category = %descriptor.category,
            params = descriptor.params.len(),
            "processor registered"
        );
        self.entries.push(RegistryEntry {
            descriptor,
            factory,
        });
        Ok(())
    }

    /// Make `alias` resolve to the registered processor `target`.
    pub fn register_alias(&mut self, alias: &'static str, target: &'static str) -> Result<()> {
        if self.resolve_id(alias).is_some() {
            return Err(RegistryError::DuplicateProcessor(alias.to_string()));
        }
        if !self.entries.iter().any(|e| e.descriptor.id == target) {
            return Err(RegistryError::UnknownProcessor(target.to_string()));
        }
        self.aliases.push((alias, target));
        Ok(())
    }

    /// Canonical id for `id`, following aliases.
    pub fn resolve_id(&self, id: &str) -> Option<&'static str> {
        self.entry(id).map(|e| e.descriptor.id)
    }

    fn entry(&self, id: &str) -> Option<&RegistryEntry> {
        let id = self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == id)
            .map_or(id, |(_, target)| *target);
        self.entries.iter().find(|e| e.descriptor.id == id)
    }

    /// Returns descriptors for all registered processors, in registration order.
    pub fn all(&self) -> Vec<&ProcessorDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for processors in one category.
    pub fn by_category(&self, category: ProcessorCategory) -> Vec<&ProcessorDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by id or alias.
    pub fn get(&self, id: &str) -> Option<&ProcessorDescriptor> {
        self.entry(id).map(|e| &e.descriptor)
    }

    /// Parameter schema of a processor.
    pub fn schema(&self, id: &str) -> Option<&[ParameterDefinition]> {
        self.get(id).map(|d| d.params.as_slice())
    }

    /// Registered ids, in registration order. Aliases are not included.
    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.descriptor.id).collect()
    }

    /// Every parameter definition across all processors, in registration order.
    ///
    /// A name shared by several processors appears once per processor.
    pub fn all_parameters(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.entries.iter().flat_map(|e| e.descriptor.params.iter())
    }

    /// Validate `overrides` for processor `id` and merge them over its defaults.
    pub fn resolve(&self, id: &str, overrides: &ParameterSnapshot) -> Result<ParameterSnapshot> {
        let entry = self
            .entry(id)
            .ok_or_else(|| RegistryError::UnknownProcessor(id.to_string()))?;
        entry
            .descriptor
            .resolve(overrides)
            .map_err(|source| RegistryError::Validation {
                id: entry.descriptor.id.to_string(),
                source,
            })
    }

    /// Create a processor instance by id or alias.
    ///
    /// Each override is validated against the schema before anything is
    /// constructed; the error names the offending parameter and, for range
    /// violations, the valid bounds.
    pub fn create(&self, id: &str, overrides: &ParameterSnapshot) -> Result<Processor> {
        let entry = self
            .entry(id)
            .ok_or_else(|| RegistryError::UnknownProcessor(id.to_string()))?;
        let params = self.resolve(id, overrides)?;
        tracing::debug!(
            processor = entry.descriptor.id,
            overrides = overrides.len(),
            "processor created"
        );
        Ok(entry.factory.build(&params))
    }

    /// Returns the number of registered processors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no processors are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hiss_core::ParamValue;

    fn none() -> ParameterSnapshot {
        ParameterSnapshot::new()
    }

    #[test]
    fn test_registry_creation() {
        let registry = ProcessorRegistry::new();
        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.ids(),
            ["xorshift", "fractal", "bandpass", "lowpass", "resonant_lowpass"]
        );
        assert!(ProcessorRegistry::empty().is_empty());
    }

    #[test]
    fn test_by_category() {
        let registry = ProcessorRegistry::new();

        let noise = registry.by_category(ProcessorCategory::Noise);
        assert_eq!(noise.len(), 2); // xorshift, fractal

        let filters = registry.by_category(ProcessorCategory::Filter);
        assert_eq!(filters.len(), 3); // bandpass, lowpass, resonant_lowpass
    }

    #[test]
    fn test_get_and_schema() {
        let registry = ProcessorRegistry::new();

        let bandpass = registry.get("bandpass").unwrap();
        assert_eq!(bandpass.name, "Bandpass");
        assert_eq!(bandpass.category, ProcessorCategory::Filter);

        let schema = registry.schema("resonant_lowpass").unwrap();
        let names: Vec<_> = schema.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            ["cutoff", "resonance", "poles", "volume", "mapping", "trend_removal"]
        );

        assert!(registry.get("nonexistent").is_none());
        assert!(registry.schema("nonexistent").is_none());
    }

    #[test]
    fn test_noise_alias() {
        let registry = ProcessorRegistry::new();
        assert_eq!(registry.resolve_id("noise"), Some("xorshift"));
        assert_eq!(registry.get("noise").unwrap().id, "xorshift");
        assert!(!registry.ids().contains(&"noise"));

        let processor = registry.create("noise", &none()).unwrap();
        assert_eq!(processor.category(), ProcessorCategory::Noise);
    }

    #[test]
    fn test_all_processors_can_be_created() {
        let registry = ProcessorRegistry::new();

        for descriptor in registry.all() {
            let processor = registry
                .create(descriptor.id, &none())
                .unwrap_or_else(|e| panic!("failed to create {}: {e}", descriptor.id));
            assert_eq!(processor.category(), descriptor.category);

            match processor {
                Processor::Noise(mut source) => {
                    let block = source.generate(256);
                    assert!(block.iter().all(|s| s.is_finite()));
                }
                Processor::Filter(mut filter) => {
                    let block = filter.process(&[0.5; 256], &descriptor.defaults()).unwrap();
                    assert!(block.iter().all(|s| s.is_finite()));
                }
            }
        }
    }

    #[test]
    fn test_create_uses_overrides() {
        let registry = ProcessorRegistry::new();
        let a = registry
            .create("xorshift", &ParameterSnapshot::new().with("seed", 42))
            .unwrap();
        let mut a = a.into_noise().unwrap();
        let mut b = hiss_effects::XorShiftNoise::new(42);
        assert_eq!(a.generate(16), b.generate(16));
    }

    #[test]
    fn test_create_rejects_out_of_range_with_bounds() {
        let registry = ProcessorRegistry::new();
        let err = registry
            .create("bandpass", &ParameterSnapshot::new().with("cutoff", 1.5))
            .unwrap_err();

        match &err {
            RegistryError::Validation { id, source } => {
                assert_eq!(id, "bandpass");
                assert_eq!(source.param(), Some("cutoff"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("cutoff"), "{message}");
        assert!(message.contains("[0, 1]"), "{message}");
    }

    #[test]
    fn test_create_reports_every_bad_override() {
        let registry = ProcessorRegistry::new();
        let overrides = ParameterSnapshot::new()
            .with("poles", 7)
            .with("mapping", "quartic")
            .with("nope", true);
        let err = registry.create("resonant_lowpass", &overrides).unwrap_err();

        let RegistryError::Validation {
            source: ValidationError::Multiple(errors),
            ..
        } = &err
        else {
            panic!("expected multiple errors, got {err:?}");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_create_rejects_parameters_of_other_processors() {
        let registry = ProcessorRegistry::new();
        let err = registry
            .create("bandpass", &ParameterSnapshot::new().with("poles", 2))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Validation {
                source: ValidationError::UnknownParameter(_),
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_processor() {
        let registry = ProcessorRegistry::new();
        assert_eq!(
            registry.create("granular", &none()).unwrap_err(),
            RegistryError::UnknownProcessor("granular".to_string())
        );
    }

    #[test]
    fn test_resolve_widens_ints_for_floats() {
        let registry = ProcessorRegistry::new();
        let resolved = registry
            .resolve("bandpass", &ParameterSnapshot::new().with("volume", 1))
            .unwrap();
        assert_eq!(resolved.get("volume"), Some(&ParamValue::Float(1.0)));
        assert_eq!(resolved.get("cutoff"), Some(&ParamValue::Float(0.5)));
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = ProcessorRegistry::new();
        let err = registry
            .register(
                ProcessorDescriptor {
                    id: "bandpass",
                    name: "Another",
                    description: "",
                    category: ProcessorCategory::Filter,
                    params: Vec::new(),
                },
                ProcessorFactory::Filter(|_| Box::new(Bandpass::default())),
            )
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateProcessor("bandpass".to_string()));

        assert!(matches!(
            registry.register_alias("noise", "fractal"),
            Err(RegistryError::DuplicateProcessor(_))
        ));
        assert!(matches!(
            registry.register_alias("grain", "granular"),
            Err(RegistryError::UnknownProcessor(_))
        ));
    }

    #[test]
    fn test_register_category_mismatch() {
        let mut registry = ProcessorRegistry::empty();
        let err = registry
            .register(
                ProcessorDescriptor {
                    id: "white",
                    name: "White",
                    description: "",
                    category: ProcessorCategory::Filter,
                    params: XorShiftNoise::parameters(),
                },
                ProcessorFactory::Noise(|p| Box::new(XorShiftNoise::from_params(p))),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::CategoryMismatch { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_invalid_schema() {
        let mut registry = ProcessorRegistry::empty();
        let descriptor = |params| ProcessorDescriptor {
            id: "odd",
            name: "Odd",
            description: "",
            category: ProcessorCategory::Filter,
            params,
        };
        let factory = ProcessorFactory::Filter(|_| Box::new(Bandpass::default()));

        let bad_default = vec![ParameterDefinition::float("gain", 0.0, 1.0, 2.0)];
        assert!(matches!(
            registry.register(descriptor(bad_default), factory),
            Err(RegistryError::InvalidSchema { .. })
        ));

        let repeated = vec![ParameterDefinition::volume(), ParameterDefinition::volume()];
        assert!(matches!(
            registry.register(descriptor(repeated), factory),
            Err(RegistryError::InvalidSchema { .. })
        ));
        assert!(registry.is_empty());
    }
}
