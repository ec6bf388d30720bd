//! Processor traits: noise sources and filter stages.
//!
//! A processing chain starts with exactly one [`NoiseSource`] followed by any
//! number of [`FilterStage`]s. The two roles are separate traits rather than
//! one trait with a dual-purpose signature, so the chain knows statically
//! what each stage does.
//!
//! ## Design Decisions
//!
//! - **Mono blocks**: sources and filters work on `f32` blocks in [-1.0, 1.0].
//!
//! - **Object-safe**: both traits are used as `Box<dyn ...>` so the chain can
//!   be rebuilt at runtime from a configuration list.
//!
//! - **In-place, allocation-free core**: [`NoiseSource::generate_into`] and
//!   [`FilterStage::process_in_place`] write into caller-owned buffers. The
//!   allocating [`generate`](NoiseSource::generate) and
//!   [`process`](FilterStage::process) wrappers exist for offline use and tests.
//!
//! - **Parameters per block**: filters receive the current
//!   [`ParameterSnapshot`] on every call. Sources read theirs through
//!   [`NoiseSource::update`] once per block.

use crate::error::ValidationResult;
use crate::snapshot::ParameterSnapshot;
use std::fmt;

/// A block of mono samples, nominally in [-1.0, 1.0].
pub type AudioBlock = Vec<f32>;

/// Role of a processor within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorCategory {
    /// Generates samples from internal state. Always the first stage.
    Noise,
    /// Transforms an incoming block.
    Filter,
}

impl ProcessorCategory {
    /// All categories, in chain order.
    pub const ALL: [ProcessorCategory; 2] = [ProcessorCategory::Noise, ProcessorCategory::Filter];

    /// Lowercase identifier (`"noise"` / `"filter"`).
    pub const fn name(&self) -> &'static str {
        match self {
            ProcessorCategory::Noise => "noise",
            ProcessorCategory::Filter => "filter",
        }
    }

    /// Short description for listings.
    pub const fn description(&self) -> &'static str {
        match self {
            ProcessorCategory::Noise => "Pseudo-random sample generators",
            ProcessorCategory::Filter => "Spectral shaping stages",
        }
    }
}

impl fmt::Display for ProcessorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A generator of pseudo-random samples.
///
/// Output is a deterministic function of the internal state, which advances
/// with every sample produced and is only ever set at construction.
///
/// # Example
///
/// ```rust
/// use hiss_core::NoiseSource;
///
/// struct Ramp(f32);
///
/// impl NoiseSource for Ramp {
///     fn generate_into(&mut self, out: &mut [f32]) {
///         for sample in out.iter_mut() {
///             self.0 = (self.0 + 0.1) % 1.0;
///             *sample = self.0;
///         }
///     }
/// }
///
/// let mut ramp = Ramp(0.0);
/// assert_eq!(ramp.generate(4).len(), 4);
/// ```
pub trait NoiseSource: Send {
    /// Fill `out` with the next `out.len()` samples.
    fn generate_into(&mut self, out: &mut [f32]);

    /// Produce `frames` fresh samples.
    fn generate(&mut self, frames: usize) -> AudioBlock {
        let mut block = vec![0.0; frames];
        self.generate_into(&mut block);
        block
    }

    /// Pick up live parameter changes. Called once per block before generating.
    ///
    /// Parameters that only make sense at construction (such as the seed)
    /// are ignored here. Default does nothing.
    fn update(&mut self, _params: &ParameterSnapshot) {}
}

/// A stateful block filter.
///
/// Implementations own their history (previous inputs and outputs), which
/// persists across calls and is cleared only by [`reset`](Self::reset) or by
/// dropping the stage.
pub trait FilterStage: Send {
    /// Filter `block` in place using the values in `params`.
    ///
    /// Missing parameters fall back to the settings the stage was created
    /// with. Output samples are clamped to [-1.0, 1.0]. An invalid setting
    /// is reported before any history is touched.
    fn process_in_place(
        &mut self,
        block: &mut [f32],
        params: &ParameterSnapshot,
    ) -> ValidationResult<()>;

    /// Filter a copy of `block`.
    fn process(
        &mut self,
        block: &[f32],
        params: &ParameterSnapshot,
    ) -> ValidationResult<AudioBlock> {
        let mut out = block.to_vec();
        self.process_in_place(&mut out, params)?;
        Ok(out)
    }

    /// Clear all history.
    fn reset(&mut self);
}

/// A constructed processor, tagged by category.
pub enum Processor {
    /// A chain head.
    Noise(Box<dyn NoiseSource>),
    /// A chain stage after the head.
    Filter(Box<dyn FilterStage>),
}

impl Processor {
    /// Category of the wrapped processor.
    pub fn category(&self) -> ProcessorCategory {
        match self {
            Processor::Noise(_) => ProcessorCategory::Noise,
            Processor::Filter(_) => ProcessorCategory::Filter,
        }
    }

    /// Unwrap a noise source.
    pub fn into_noise(self) -> Option<Box<dyn NoiseSource>> {
        match self {
            Processor::Noise(source) => Some(source),
            Processor::Filter(_) => None,
        }
    }

    /// Unwrap a filter stage.
    pub fn into_filter(self) -> Option<Box<dyn FilterStage>> {
        match self {
            Processor::Filter(stage) => Some(stage),
            Processor::Noise(_) => None,
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Processor").field(&self.category()).finish()
    }
}
