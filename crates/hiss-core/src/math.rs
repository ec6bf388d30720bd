//! Small block and sample utilities shared by the processors.
//!
//! All functions are allocation-free and safe to call from the render thread.

use libm::{sqrtf, tanhf};

/// Soft clip using hyperbolic tangent.
///
/// Smooth saturation that approaches ±1 asymptotically. Used to bound
/// feedback paths so resonant stages can sustain oscillation without
/// blowing up.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Flush denormal numbers to zero.
///
/// Values with magnitude below 1e-20 are replaced with 0.0 so decaying
/// filter tails do not fall into the slow denormal range.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Clamp every sample of `block` to [-1.0, 1.0].
#[inline]
pub fn clamp_block(block: &mut [f32]) {
    for sample in block.iter_mut() {
        *sample = sample.clamp(-1.0, 1.0);
    }
}

/// Arithmetic mean of `block`; 0.0 for an empty block.
///
/// Accumulates in `f64` so long blocks keep their precision.
pub fn mean(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let sum: f64 = block.iter().map(|&s| f64::from(s)).sum();
    (sum / block.len() as f64) as f32
}

/// Root-mean-square level of `block`; 0.0 for an empty block.
pub fn rms(block: &[f32]) -> f32 {
    if block.is_empty() {
        return 0.0;
    }
    let sum: f64 = block.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    sqrtf((sum / block.len() as f64) as f32)
}

/// Largest absolute sample value in `block`.
pub fn peak(block: &[f32]) -> f32 {
    block.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_clip_is_bounded() {
        assert!(soft_clip(100.0) <= 1.0);
        assert!(soft_clip(-100.0) >= -1.0);
        assert_eq!(soft_clip(0.0), 0.0);
    }

    #[test]
    fn flush_denormal_zeroes_tiny_values() {
        assert_eq!(flush_denormal(1e-25), 0.0);
        assert_eq!(flush_denormal(0.5), 0.5);
    }

    #[test]
    fn clamp_block_limits_range() {
        let mut block = [2.0, -3.0, 0.5];
        clamp_block(&mut block);
        assert_eq!(block, [1.0, -1.0, 0.5]);
    }

    #[test]
    fn block_statistics() {
        let block = [1.0, -1.0, 1.0, -1.0];
        assert_eq!(mean(&block), 0.0);
        assert!((rms(&block) - 1.0).abs() < 1e-6);
        assert_eq!(peak(&[0.25, -0.75]), 0.75);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }
}
