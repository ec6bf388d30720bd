//! Processing chain: one noise source followed by filter stages.
//!
//! A [`ProcessingChain`] is built from a [`ChainConfig`] against an explicit
//! [`ProcessorRegistry`]. Every structural problem (empty chain, filter in
//! first position, unknown id, rejected overrides) is reported by
//! [`ProcessingChain::build`]; rendering only fails when a snapshot carries
//! a setting a stage rejects.
//!
//! Rebuilding a chain constructs fresh processors, discarding all filter
//! history. That is the intended way to reset state when the configuration
//! changes.
//!
//! # Example
//!
//! ```rust
//! use hiss_config::{ChainConfig, ProcessingChain, ProcessorConfig};
//! use hiss_core::ParameterSnapshot;
//! use hiss_registry::ProcessorRegistry;
//!
//! let registry = ProcessorRegistry::new();
//! let config = ChainConfig::new(vec![
//!     ProcessorConfig::new("fractal").with_param("octaves", 6),
//!     ProcessorConfig::new("lowpass").with_param("poles", 2),
//! ]);
//!
//! let mut chain = ProcessingChain::build(&registry, &config).unwrap();
//! let block = chain.render_block(1024, &ParameterSnapshot::new()).unwrap();
//! assert_eq!(block.len(), 1024);
//! ```

use crate::config::ChainConfig;
use crate::error::ConfigError;
use hiss_core::{
    AudioBlock, FilterStage, NoiseSource, ParameterSnapshot, Processor, ProcessorCategory,
    ValidationResult,
};
use hiss_registry::ProcessorRegistry;

/// An ordered noise source plus filter stages.
pub struct ProcessingChain {
    source: Box<dyn NoiseSource>,
    filters: Vec<Box<dyn FilterStage>>,
    ids: Vec<&'static str>,
}

impl ProcessingChain {
    /// Build a chain from configuration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::EmptyChain`] if there are no stages
    /// - [`ConfigError::UnknownProcessor`] for an id the registry lacks
    /// - [`ConfigError::FirstStageNotGenerator`] if stage 0 is a filter
    /// - [`ConfigError::GeneratorAfterFirst`] if a later stage is a noise source
    /// - [`ConfigError::Registry`] if a stage's overrides fail validation
    pub fn build(registry: &ProcessorRegistry, config: &ChainConfig) -> Result<Self, ConfigError> {
        if config.is_empty() {
            return Err(ConfigError::EmptyChain);
        }

        // Check the shape before constructing anything.
        let mut ids = Vec::with_capacity(config.len());
        for (index, stage) in config.iter().enumerate() {
            let descriptor = registry
                .get(&stage.kind)
                .ok_or_else(|| ConfigError::UnknownProcessor(stage.kind.clone()))?;
            match (index, descriptor.category) {
                (0, ProcessorCategory::Filter) => {
                    return Err(ConfigError::FirstStageNotGenerator(stage.kind.clone()));
                }
                (1.., ProcessorCategory::Noise) => {
                    return Err(ConfigError::GeneratorAfterFirst {
                        index,
                        id: stage.kind.clone(),
                    });
                }
                _ => ids.push(descriptor.id),
            }
        }

        let mut source = None;
        let mut filters = Vec::with_capacity(config.len() - 1);
        for stage in config.iter() {
            match registry.create(&stage.kind, &stage.overrides())? {
                Processor::Noise(noise) => source = Some(noise),
                Processor::Filter(filter) => filters.push(filter),
            }
        }
        let source = source.ok_or(ConfigError::EmptyChain)?;

        tracing::info!(stages = ?ids, "processing chain built");
        Ok(Self {
            source,
            filters,
            ids,
        })
    }

    /// Build the default `xorshift → bandpass` chain.
    pub fn default_chain(registry: &ProcessorRegistry) -> Result<Self, ConfigError> {
        Self::build(registry, &ChainConfig::default())
    }

    /// Render one block into `out` using `params`.
    ///
    /// The source picks up live settings, fills `out`, then each filter
    /// processes it in place. Does not allocate.
    pub fn render_into(&mut self, out: &mut [f32], params: &ParameterSnapshot) -> ValidationResult<()> {
        self.source.update(params);
        self.source.generate_into(out);
        for filter in &mut self.filters {
            filter.process_in_place(out, params)?;
        }
        Ok(())
    }

    /// Render `frames` samples into a new block.
    pub fn render_block(
        &mut self,
        frames: usize,
        params: &ParameterSnapshot,
    ) -> ValidationResult<AudioBlock> {
        let mut block = vec![0.0; frames];
        self.render_into(&mut block, params)?;
        Ok(block)
    }

    /// Clear the history of every filter. The source keeps its state.
    pub fn reset(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }

    /// Canonical ids of the stages, in order.
    pub fn stage_ids(&self) -> &[&'static str] {
        &self.ids
    }

    /// Number of stages, including the source.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Always false; a built chain has at least its source.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl std::fmt::Debug for ProcessingChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingChain")
            .field("stages", &self.ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorConfig;
    use hiss_core::ValidationError;
    use hiss_effects::{Bandpass, XorShiftNoise};

    fn chain(stages: &[&str]) -> Result<ProcessingChain, ConfigError> {
        let config = ChainConfig::new(stages.iter().map(|s| ProcessorConfig::new(*s)).collect());
        ProcessingChain::build(&ProcessorRegistry::new(), &config)
    }

    #[test]
    fn test_empty_chain_rejected() {
        assert!(matches!(chain(&[]), Err(ConfigError::EmptyChain)));
    }

    #[test]
    fn test_filter_first_rejected() {
        assert!(matches!(
            chain(&["bandpass", "lowpass"]),
            Err(ConfigError::FirstStageNotGenerator(id)) if id == "bandpass"
        ));
    }

    #[test]
    fn test_second_generator_rejected() {
        assert!(matches!(
            chain(&["xorshift", "lowpass", "fractal"]),
            Err(ConfigError::GeneratorAfterFirst { index: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_processor_rejected() {
        assert!(matches!(
            chain(&["xorshift", "wah"]),
            Err(ConfigError::UnknownProcessor(id)) if id == "wah"
        ));
    }

    #[test]
    fn test_invalid_init_param_rejected() {
        let config = ChainConfig::new(vec![
            ProcessorConfig::new("xorshift"),
            ProcessorConfig::new("lowpass").with_param("poles", 6),
        ]);
        let err = ProcessingChain::build(&ProcessorRegistry::new(), &config).unwrap_err();
        assert!(matches!(err, ConfigError::Registry(_)), "{err:?}");
        assert!(err.to_string().contains("poles"));
    }

    #[test]
    fn test_alias_and_stage_ids() {
        let chain = chain(&["noise", "bandpass", "resonant_lowpass"]).unwrap();
        assert_eq!(chain.stage_ids(), ["xorshift", "bandpass", "resonant_lowpass"]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_default_chain_matches_manual_pipeline() {
        let registry = ProcessorRegistry::new();
        let mut chain = ProcessingChain::default_chain(&registry).unwrap();
        let params = ParameterSnapshot::new();

        let mut noise = XorShiftNoise::default();
        let mut band = Bandpass::default();
        for _ in 0..3 {
            let expected = band.process(&noise.generate(512), &params).unwrap();
            assert_eq!(chain.render_block(512, &params).unwrap(), expected);
        }
    }

    #[test]
    fn test_generator_only_chain() {
        let mut chain = chain(&["xorshift"]).unwrap();
        let block = chain.render_block(4, &ParameterSnapshot::new()).unwrap();
        assert!((block[0] - 0.553_877_4).abs() < 1e-6);
    }

    #[test]
    fn test_render_reports_rejected_setting() {
        let mut chain = chain(&["xorshift", "lowpass"]).unwrap();
        let bad = ParameterSnapshot::new().with("poles", 9);
        assert_eq!(
            chain.render_block(64, &bad),
            Err(ValidationError::InvalidPoleCount(9))
        );
    }

    #[test]
    fn test_rebuild_discards_filter_state() {
        let params = ParameterSnapshot::new().with("resonance", 0.8).with("poles", 4);
        let mut first = chain(&["xorshift", "lowpass"]).unwrap();
        let a = first.render_block(256, &params).unwrap();
        first.render_block(256, &params).unwrap();

        let mut rebuilt = chain(&["xorshift", "lowpass"]).unwrap();
        assert_eq!(rebuilt.render_block(256, &params).unwrap(), a);
    }
}
