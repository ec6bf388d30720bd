//! One-pole low-pass and high-pass stages with a normalized coefficient.
//!
//! Both stages are driven by a smoothing coefficient `alpha` in (0, 1]
//! rather than a frequency in Hz, so their response does not depend on the
//! sample rate. Low-pass difference equation:
//!
//! ```text
//! y[n] = alpha * x[n] + (1 - alpha) * y[n-1]
//! ```
//!
//! High-pass difference equation (a DC blocker with pole `1 - alpha`):
//!
//! ```text
//! y[n] = x[n] - x[n-1] + (1 - alpha) * y[n-1]
//! ```
//!
//! Smaller `alpha` means heavier smoothing for the low-pass and a lower
//! corner for the high-pass. Each stage owns its history, which persists
//! across blocks until [`reset`](OnePole::reset).
//!
//! # Usage
//!
//! ```rust
//! use hiss_core::OnePole;
//!
//! let mut lp = OnePole::new(0.1);
//! let filtered = lp.process(1.0);
//! assert!((filtered - 0.1).abs() < 1e-6);
//! ```

use crate::flush_denormal;

/// Map a normalized cutoff in [0, 1] to a one-pole coefficient in [0.001, 0.1].
///
/// `alpha = 0.001 + cutoff * 0.099`
#[inline]
pub fn linear_alpha(cutoff: f32) -> f32 {
    0.001 + cutoff.clamp(0.0, 1.0) * 0.099
}

/// One-pole (6 dB/oct) low-pass stage.
///
/// # Invariants
///
/// - `alpha` is kept in [1e-6, 1.0] for stable operation
/// - `state` is flushed to zero when below 1e-20 (denormal protection)
#[derive(Debug, Clone)]
pub struct OnePole {
    alpha: f32,
    state: f32,
}

impl OnePole {
    /// Create a stage with zeroed history.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(1e-6, 1.0),
            state: 0.0,
        }
    }

    /// Set the smoothing coefficient. History is kept.
    #[inline]
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(1e-6, 1.0);
    }

    /// Current smoothing coefficient.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Previous output `y[n-1]`.
    #[inline]
    pub fn last(&self) -> f32 {
        self.state
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(self.alpha * input + (1.0 - self.alpha) * self.state);
        self.state
    }

    /// Reset history to zero.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }
}

impl Default for OnePole {
    fn default() -> Self {
        Self::new(linear_alpha(0.5))
    }
}

/// One-pole high-pass stage.
///
/// Keeps the previous raw input alongside the previous output, so a block
/// boundary does not produce a step.
#[derive(Debug, Clone)]
pub struct OnePoleHighPass {
    alpha: f32,
    x_prev: f32,
    y_prev: f32,
}

impl OnePoleHighPass {
    /// Create a stage with zeroed history.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(1e-6, 1.0),
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// Set the coefficient. History is kept.
    #[inline]
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(1e-6, 1.0);
    }

    /// Current coefficient.
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Process one sample.
    ///
    /// Implements: y[n] = x[n] - x[n-1] + (1 - alpha) * y[n-1]
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = flush_denormal(input - self.x_prev + (1.0 - self.alpha) * self.y_prev);
        self.x_prev = input;
        self.y_prev = output;
        output
    }

    /// Reset history to zero.
    pub fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}
