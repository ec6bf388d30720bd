//! Configuration, parameter store and processing chains for hiss.
//!
//! This crate ties the processor registry to runtime state: it loads engine
//! settings from TOML, keeps the live parameter snapshot, and assembles the
//! ordered chain of processors that renders each block.
//!
//! # Features
//!
//! - **Engine Config**: Render settings and chain layout, loaded from and saved to TOML
//! - **Parameter Store**: Validated, atomic updates published as immutable snapshots
//! - **Change Notification**: Subscribers receive every accepted snapshot
//! - **Processing Chains**: One noise source followed by filter stages, checked at build time
//!
//! # Example
//!
//! ```rust
//! use hiss_config::{EngineConfig, ParameterStore, ProcessingChain};
//! use hiss_core::ParamValue;
//! use hiss_registry::ProcessorRegistry;
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     [render]
//!     block_size = 512
//!
//!     [[processors]]
//!     type = "xorshift"
//!
//!     [[processors]]
//!     type = "lowpass"
//!     params = { poles = 2 }
//! "#).unwrap();
//!
//! let registry = ProcessorRegistry::new();
//! let store = ParameterStore::from_registry(&registry).unwrap();
//! store.apply_initial(&config.processors.initial_values()).unwrap();
//! let mut chain = ProcessingChain::build(&registry, &config.processors).unwrap();
//!
//! store.update([("cutoff", ParamValue::Float(0.2))]).unwrap();
//! let block = chain
//!     .render_block(config.render.block_size, &store.snapshot())
//!     .unwrap();
//! assert_eq!(block.len(), 512);
//! ```

mod chain;
mod config;
mod error;
mod store;

pub use chain::ProcessingChain;
pub use config::{
    ChainConfig, ConfigValue, EngineConfig, ProcessorConfig, RenderSettings, parse_assignment,
    parse_param_value,
};
pub use error::ConfigError;
pub use store::{ParameterStore, SUBSCRIBER_CAPACITY, SnapshotReader};

/// Re-export commonly used types from hiss-registry
pub use hiss_registry::{ProcessorDescriptor, ProcessorRegistry, RegistryError};
