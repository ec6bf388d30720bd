//! Block-level DC offset removal.
//!
//! Two passes are available:
//!
//! - [`remove_mean`] subtracts the block mean, leaving an exactly zero-mean
//!   block (up to rounding).
//! - [`TrendRemover`] subtracts a centered moving average, which also takes
//!   out slow drift inside the block. The window is zero-padded at the block
//!   edges, so the first and last `window / 2` samples see a partial average.
//!
//! Neither pass keeps history across blocks: both work on what they are given.

use crate::math::mean;

/// Subtract the mean of `block` from every sample. Returns the removed mean.
#[inline]
pub fn remove_mean(block: &mut [f32]) -> f32 {
    let offset = mean(block);
    if offset != 0.0 {
        for sample in block.iter_mut() {
            *sample -= offset;
        }
    }
    offset
}

/// Windowed trend removal using a centered moving average.
///
/// For window `W` the trend at sample `n` is the sum of
/// `x[n - W/2 ..= n + W/2 - 1]` divided by `W`, with samples outside the
/// block taken as zero.
///
/// ## Example
///
/// ```rust
/// use hiss_core::TrendRemover;
///
/// let mut trend = TrendRemover::new(64);
/// let mut ramp: Vec<f32> = (0..256).map(|i| i as f32 / 256.0).collect();
/// trend.process(&mut ramp);
/// // Away from the edges a linear ramp is fully explained by its trend.
/// assert!(ramp[128].abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct TrendRemover {
    window: usize,
    prefix: Vec<f64>,
}

impl TrendRemover {
    /// Window used by the resonant cascade.
    pub const DEFAULT_WINDOW: usize = 64;

    /// Create a remover with the given window (at least 2).
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(2),
            prefix: Vec::new(),
        }
    }

    /// Window length in samples.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Pre-size the internal buffer for blocks up to `frames` long.
    pub fn reserve(&mut self, frames: usize) {
        let needed = frames + 1;
        if self.prefix.capacity() < needed {
            self.prefix.reserve(needed - self.prefix.len());
        }
    }

    /// Subtract the moving-average trend from `block`.
    ///
    /// Allocates only when `block` is longer than any block seen (or
    /// reserved) before.
    pub fn process(&mut self, block: &mut [f32]) {
        let len = block.len();
        if len == 0 {
            return;
        }

        self.prefix.clear();
        self.prefix.push(0.0);
        let mut running = 0.0f64;
        for &sample in block.iter() {
            running += f64::from(sample);
            self.prefix.push(running);
        }

        let half = self.window / 2;
        let scale = 1.0 / self.window as f64;
        for (n, sample) in block.iter_mut().enumerate() {
            let lo = n.saturating_sub(half);
            let hi = (n + self.window - half).min(len);
            let trend = (self.prefix[hi] - self.prefix[lo]) * scale;
            *sample -= trend as f32;
        }
    }
}

impl Default for TrendRemover {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_mean_zeroes_offset() {
        let mut block = [1.5, 0.5, 1.0, 1.0];
        let removed = remove_mean(&mut block);
        assert_eq!(removed, 1.0);
        assert_eq!(block, [0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_remove_mean_empty() {
        let mut block: [f32; 0] = [];
        assert_eq!(remove_mean(&mut block), 0.0);
    }

    #[test]
    fn test_trend_removes_constant_away_from_edges() {
        let mut trend = TrendRemover::new(64);
        let mut block = vec![0.5f32; 512];
        trend.process(&mut block);
        for &s in &block[32..480] {
            assert!(s.abs() < 1e-6, "interior should be flat, got {s}");
        }
        // edges only see part of the window
        assert!(block[0] > 0.2);
    }

    #[test]
    fn test_trend_keeps_fast_content() {
        let mut trend = TrendRemover::default();
        let mut block: Vec<f32> = (0..1024)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        trend.process(&mut block);
        // alternating signal has no trend over an even window
        assert!((block[500] - 0.5).abs() < 1e-6);
        assert!((block[501] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_window_floor() {
        assert_eq!(TrendRemover::new(0).window(), 2);
    }
}
