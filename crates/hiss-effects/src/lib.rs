//! Hiss Effects - noise sources and filter stages
//!
//! This crate provides the processors that hiss chains are built from:
//!
//! - [`XorShiftNoise`] - Seeded 32-bit xorshift white noise
//! - [`FractalNoise`] - Multi-octave noise layered from the xorshift source
//! - [`Bandpass`] - One-pole high-pass into one-pole low-pass band filter
//! - [`CascadedLowPass`] - 1 to 4 cascaded one-pole low-passes with resonance
//!
//! ## Example
//!
//! ```rust
//! use hiss_core::{FilterStage, NoiseSource, ParameterSnapshot};
//! use hiss_effects::{Bandpass, CascadedLowPass, XorShiftNoise};
//!
//! let params = ParameterSnapshot::new()
//!     .with("cutoff", 0.3)
//!     .with("resonance", 0.6)
//!     .with("poles", 2);
//!
//! let mut noise = XorShiftNoise::new(12345);
//! let mut band = Bandpass::default();
//! let mut lowpass = CascadedLowPass::lowpass();
//!
//! let mut block = noise.generate(1024);
//! band.process_in_place(&mut block, &params).unwrap();
//! lowpass.process_in_place(&mut block, &params).unwrap();
//! assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));
//! ```

pub mod bandpass;
pub mod cascade;
pub mod fractal;
pub mod xorshift;

// Re-export main types at crate root
pub use bandpass::{Bandpass, BandpassSettings};
pub use cascade::{
    CascadeSettings, CascadedLowPass, CoefficientMapping, FeedbackPolicy, MAX_POLES,
    critical_gain, validate_poles,
};
pub use fractal::{FractalNoise, FractalSettings};
pub use xorshift::{DEFAULT_SEED, XorShiftNoise, next_state, state_to_sample};
