//! Control-thread facade over registry, parameter store and render bridge.

use crate::Result;
use crate::bridge::{BridgeState, RenderBridge};
use crate::sink::AudioSink;
use crossbeam_channel::Receiver;
use hiss_config::{ChainConfig, EngineConfig, ParameterStore, ProcessingChain};
use hiss_core::{
    ParamValue, ParameterDefinition, ParameterSnapshot, ProcessorCategory, ValidationResult,
};
use hiss_registry::{ProcessorDescriptor, ProcessorRegistry};
use std::sync::Arc;
use std::time::Duration;

/// The noise engine as seen from the control surface.
///
/// Parameter updates go to the [`ParameterStore`] and reach the render
/// thread at the next block boundary. Chain changes build a fresh chain on
/// the calling thread and hand it to the render thread, which drops the old
/// one along with its filter history.
///
/// # Example
///
/// ```rust
/// use hiss_config::EngineConfig;
/// use hiss_core::{ParamValue, ProcessorCategory};
/// use hiss_io::{BridgeState, MemorySink, NoiseEngine};
///
/// let sink = MemorySink::new(4096);
/// let capture = sink.capture();
/// let mut engine = NoiseEngine::new(&EngineConfig::default(), Box::new(sink)).unwrap();
///
/// assert!(engine.processors(ProcessorCategory::Filter).len() >= 3);
/// assert!(engine.update_parameters([("bandwidth", ParamValue::Float(1.5))]).is_err());
///
/// engine.start().unwrap();
/// assert_eq!(engine.wait(None).unwrap(), BridgeState::Stopped);
/// assert_eq!(capture.samples().len(), 4096);
/// ```
pub struct NoiseEngine {
    registry: ProcessorRegistry,
    store: ParameterStore,
    chain: ChainConfig,
    bridge: RenderBridge,
}

impl NoiseEngine {
    /// Create an engine with the built-in processors.
    pub fn new(config: &EngineConfig, sink: Box<dyn AudioSink>) -> Result<Self> {
        Self::with_registry(ProcessorRegistry::new(), config, sink)
    }

    /// Create an engine with a caller-supplied registry.
    ///
    /// The chain is built and its initial parameter values are loaded into
    /// the store before anything renders.
    pub fn with_registry(
        registry: ProcessorRegistry,
        config: &EngineConfig,
        sink: Box<dyn AudioSink>,
    ) -> Result<Self> {
        config.render.validate()?;
        let store = ParameterStore::from_registry(&registry)?;
        let chain = ProcessingChain::build(&registry, &config.processors)?;
        store
            .apply_initial(&config.processors.initial_values())
            .map_err(hiss_config::ConfigError::from)?;

        let bridge = RenderBridge::new(chain, sink, store.reader(), config.render.clone());
        tracing::debug!(
            processors = registry.len(),
            parameters = store.len(),
            "noise engine created"
        );
        Ok(Self {
            registry,
            store,
            chain: config.processors.clone(),
            bridge,
        })
    }

    /// Apply parameter changes atomically.
    ///
    /// On error nothing changes and the previous sound continues.
    pub fn update_parameters<K: Into<String>>(
        &self,
        changes: impl IntoIterator<Item = (K, ParamValue)>,
    ) -> ValidationResult<Arc<ParameterSnapshot>> {
        self.store.update(changes)
    }

    /// Replace the processing chain.
    ///
    /// The new chain and its initial parameter values are validated before
    /// anything changes. The chain is handed to the render thread first and
    /// the initial values are published once it has been swapped in, so the
    /// old chain never renders with the new chain's values.
    pub fn set_chain(&mut self, chain: ChainConfig) -> Result<()> {
        let built = ProcessingChain::build(&self.registry, &chain)?;
        let initial = chain.initial_values();
        self.store
            .check(&initial)
            .map_err(hiss_config::ConfigError::from)?;

        let swapped = self.bridge.replace_chain(built);
        if self.bridge.is_running()
            && swapped
                .recv_timeout(self.bridge.settings().stop_timeout())
                .is_err()
        {
            tracing::warn!("render thread did not pick up the new chain in time");
        }
        self.store
            .apply_initial(&initial)
            .map_err(hiss_config::ConfigError::from)?;
        self.chain = chain;
        Ok(())
    }

    /// Current chain configuration.
    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    /// Current parameter snapshot.
    pub fn snapshot(&self) -> Arc<ParameterSnapshot> {
        self.store.snapshot()
    }

    /// Receive every accepted snapshot from now on.
    pub fn subscribe(&self) -> Receiver<Arc<ParameterSnapshot>> {
        self.store.subscribe()
    }

    /// Registered processors of one category.
    pub fn processors(&self, category: ProcessorCategory) -> Vec<&ProcessorDescriptor> {
        self.registry.by_category(category)
    }

    /// Parameter schema of a processor.
    pub fn schema(&self, id: &str) -> Option<&[ParameterDefinition]> {
        self.registry.schema(id)
    }

    /// The processor registry.
    pub fn registry(&self) -> &ProcessorRegistry {
        &self.registry
    }

    /// The parameter store.
    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    /// Start rendering. Does nothing if already running.
    pub fn start(&mut self) -> Result<()> {
        self.bridge.start()
    }

    /// Stop rendering, waiting at most the configured stop timeout.
    pub fn stop(&mut self) -> Result<()> {
        self.bridge.stop()
    }

    /// Wait for a finite sink to finish.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<BridgeState> {
        self.bridge.wait(timeout)
    }

    /// Render thread state.
    pub fn state(&self) -> BridgeState {
        self.bridge.state()
    }

    /// True while the render thread is running.
    pub fn is_running(&self) -> bool {
        self.bridge.is_running()
    }

    /// Blocks delivered to the sink so far.
    pub fn blocks_rendered(&self) -> u64 {
        self.bridge.blocks_rendered()
    }
}

impl std::fmt::Debug for NoiseEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseEngine")
            .field("chain", &self.chain)
            .field("bridge", &self.bridge)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::sink::MemorySink;
    use hiss_config::{ConfigError, ProcessorConfig};
    use hiss_core::ValidationError;

    fn engine(config: &EngineConfig) -> Result<NoiseEngine> {
        NoiseEngine::new(config, Box::new(MemorySink::new(256)))
    }

    #[test]
    fn test_chain_values_reach_store() {
        let mut config = EngineConfig::default();
        config.processors = ChainConfig::new(vec![
            ProcessorConfig::new("xorshift"),
            ProcessorConfig::new("lowpass").with_param("poles", 3),
        ]);
        let engine = engine(&config).unwrap();
        assert_eq!(engine.snapshot().int("poles", 0), 3);
        // Everything else starts at its schema default.
        assert_eq!(engine.snapshot().float("volume", 0.0), 0.5);
    }

    #[test]
    fn test_invalid_chain_rejected_at_construction() {
        let mut config = EngineConfig::default();
        config.processors = ChainConfig::new(vec![ProcessorConfig::new("bandpass")]);
        assert!(matches!(
            engine(&config),
            Err(Error::Config(ConfigError::FirstStageNotGenerator(_)))
        ));
    }

    #[test]
    fn test_rejected_update_keeps_snapshot() {
        let engine = engine(&EngineConfig::default()).unwrap();
        let before = engine.snapshot();
        let err = engine
            .update_parameters([("brightness", ParamValue::Float(0.5))])
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownParameter("brightness".into()));
        assert_eq!(*engine.snapshot(), *before);
    }

    #[test]
    fn test_subscribers_get_full_snapshot() {
        let engine = engine(&EngineConfig::default()).unwrap();
        let updates = engine.subscribe();
        engine
            .update_parameters([("cutoff", ParamValue::Float(0.1))])
            .unwrap();
        let snapshot = updates.try_recv().unwrap();
        assert_eq!(snapshot.float("cutoff", 0.0), 0.1);
        assert_eq!(snapshot.len(), engine.store().len());
    }

    #[test]
    fn test_set_chain_failure_changes_nothing() {
        let mut engine = engine(&EngineConfig::default()).unwrap();
        let before = engine.snapshot();
        let bad = ChainConfig::new(vec![
            ProcessorConfig::new("xorshift").with_param("seed", 7),
            ProcessorConfig::new("lowpass").with_param("poles", 9),
        ]);
        assert!(engine.set_chain(bad).is_err());
        assert_eq!(engine.chain(), &ChainConfig::default());
        assert_eq!(*engine.snapshot(), *before);
    }

    #[test]
    fn test_discovery() {
        let engine = engine(&EngineConfig::default()).unwrap();
        let noise: Vec<_> = engine
            .processors(ProcessorCategory::Noise)
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(noise, ["xorshift", "fractal"]);
        let schema = engine.schema("resonant_lowpass").unwrap();
        assert!(schema.iter().any(|p| p.name == "mapping"));
        assert!(engine.schema("wah").is_none());
    }
}
