//! Hiss Core - parameter model and processing primitives
//!
//! This crate provides the building blocks shared by every hiss processor,
//! designed for real-time use with no allocation in the render path.
//!
//! # Core Abstractions
//!
//! ## Processors
//!
//! - [`NoiseSource`] - Chain head that generates samples from a seeded state
//! - [`FilterStage`] - Stateful block filter driven by a parameter snapshot
//! - [`Processor`] - A constructed processor tagged with its [`ProcessorCategory`]
//!
//! ## Parameters
//!
//! - [`ParameterDefinition`] - Name, type, range or enum set, default, display hints
//! - [`ParamValue`] / [`ParamType`] - Typed values and their declared types
//! - [`ParameterSnapshot`] - Immutable name → value map read once per block
//! - [`ValidationError`] - Why a value or definition was rejected
//!
//! ## Filter Building Blocks
//!
//! - [`OnePole`] / [`OnePoleHighPass`] - First-order stages with a normalized coefficient
//! - [`remove_mean`] / [`TrendRemover`] - Block DC offset removal
//!
//! ## Utilities
//!
//! - [`soft_clip`], [`flush_denormal`], [`clamp_block`], [`mean`], [`rms`], [`peak`]
//!
//! # Example
//!
//! ```rust
//! use hiss_core::{OnePole, ParameterDefinition, ParameterSnapshot};
//!
//! let defs = [ParameterDefinition::cutoff(), ParameterDefinition::poles()];
//! let snapshot = ParameterSnapshot::from_defaults(&defs);
//!
//! let mut stage = OnePole::new(hiss_core::linear_alpha(snapshot.float("cutoff", 0.5)));
//! let mut block = [1.0f32; 64];
//! for sample in block.iter_mut() {
//!     *sample = stage.process(*sample);
//! }
//! assert!(block[63] > block[0]);
//! ```

pub mod dc_removal;
pub mod error;
pub mod math;
pub mod one_pole;
pub mod param;
pub mod processor;
pub mod snapshot;

pub use dc_removal::{TrendRemover, remove_mean};
pub use error::{ValidationError, ValidationResult};
pub use math::{clamp_block, flush_denormal, mean, peak, rms, soft_clip};
pub use one_pole::{OnePole, OnePoleHighPass, linear_alpha};
pub use param::{ParamRange, ParamType, ParamValue, ParameterDefinition};
pub use processor::{AudioBlock, FilterStage, NoiseSource, Processor, ProcessorCategory};
pub use snapshot::ParameterSnapshot;
