//! Audio output layer for hiss.
//!
//! This crate provides:
//!
//! - **Sinks**: the [`AudioSink`] trait with a real-time device sink
//!   ([`CpalSink`]), an offline WAV sink ([`WavSink`]) and an in-memory
//!   capture sink ([`MemorySink`])
//! - **Render thread**: [`RenderBridge`] pulls blocks from a
//!   [`ProcessingChain`](hiss_config::ProcessingChain) whenever its sink asks
//!   for one, reading the latest parameter snapshot at each block boundary
//! - **Engine facade**: [`NoiseEngine`] bundles registry, parameter store and
//!   bridge behind the control-thread API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hiss_config::EngineConfig;
//! use hiss_core::ParamValue;
//! use hiss_io::{NoiseEngine, WavSink};
//!
//! let config = EngineConfig::default();
//! let frames = config.render.frames_for(2.0);
//! let mut engine = NoiseEngine::new(&config, Box::new(WavSink::new("hiss.wav", frames)))?;
//!
//! engine.update_parameters([("cutoff", ParamValue::Float(0.3))])?;
//! engine.start()?;
//! engine.wait(None)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bridge;
mod cpal_sink;
mod engine;
mod sink;
mod wav;

pub use bridge::{BridgeState, RenderBridge};
pub use cpal_sink::{CpalSink, QUEUE_DEPTH, output_device_names};
pub use engine::NoiseEngine;
pub use sink::{AudioSink, BlockRequest, MemoryCapture, MemorySink};
pub use wav::{WavSink, read_wav};

use std::time::Duration;

/// Error types for audio output operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested sample format is not supported.
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The render thread did not acknowledge a stop request in time.
    #[error("render thread did not stop within {0:?}")]
    StopTimeout(Duration),

    /// Chain or store configuration error.
    #[error(transparent)]
    Config(#[from] hiss_config::ConfigError),
}

/// Convenience result type for audio output operations.
pub type Result<T> = std::result::Result<T, Error>;
