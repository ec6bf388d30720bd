//! Fractal (multi-octave) noise built on the xorshift source.
//!
//! Each block is the weighted sum of `octaves` layers of xorshift noise.
//! Layer `k` starts at `frequency = scale * lacunarity^k` and weight
//! `persistence^k`. A layer draws fewer raw samples the lower its frequency
//! is relative to the top layer and is stretched back to block length by
//! linear interpolation, so low layers are smooth and high layers are
//! detailed. The sum is normalized by its own peak.

use crate::xorshift::{DEFAULT_SEED, XorShiftNoise};
use hiss_core::{NoiseSource, ParameterDefinition, ParameterSnapshot, peak};
use libm::powf;

/// Live settings of a [`FractalNoise`] source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractalSettings {
    /// Number of layers (4–8).
    pub octaves: u32,
    /// Weight multiplier between layers (0.5–0.8).
    pub persistence: f32,
    /// Frequency multiplier between layers (1.0–4.0).
    pub lacunarity: f32,
    /// Starting frequency (0.1–10.0).
    pub scale: f32,
}

impl FractalSettings {
    /// Read settings from `params`, falling back to `self` for missing keys.
    pub fn resolve(&self, params: &ParameterSnapshot) -> Self {
        Self {
            octaves: params
                .int("octaves", i64::from(self.octaves))
                .clamp(1, 16) as u32,
            persistence: params.float("persistence", self.persistence),
            lacunarity: params.float("lacunarity", self.lacunarity).max(1.0),
            scale: params.float("scale", self.scale).max(1e-3),
        }
    }
}

impl Default for FractalSettings {
    fn default() -> Self {
        Self {
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            scale: 1.0,
        }
    }
}

/// Multi-octave noise source.
///
/// ## Parameters
///
/// | Name | Range | Default |
/// |------|-------|---------|
/// | `seed` | 0–4294967295 | 12345 |
/// | `octaves` | 4–8 | 4 |
/// | `persistence` | 0.5–0.8 | 0.5 |
/// | `lacunarity` | 1.0–4.0 | 2.0 |
/// | `scale` | 0.1–10.0 | 1.0 |
///
/// The seed is read at construction; the other four follow the snapshot
/// passed to [`update`](NoiseSource::update).
///
/// # Example
///
/// ```rust
/// use hiss_core::NoiseSource;
/// use hiss_effects::{FractalNoise, FractalSettings};
///
/// let mut noise = FractalNoise::new(7, FractalSettings::default());
/// let block = noise.generate(512);
/// assert!(block.iter().all(|s| (-1.0..=1.0).contains(s)));
/// ```
#[derive(Debug, Clone)]
pub struct FractalNoise {
    base: XorShiftNoise,
    settings: FractalSettings,
    raw: Vec<f32>,
}

impl FractalNoise {
    /// Create a source from a seed and settings.
    pub fn new(seed: u32, settings: FractalSettings) -> Self {
        Self {
            base: XorShiftNoise::new(seed),
            settings,
            raw: Vec::new(),
        }
    }

    /// Create a source from `params` (seed plus the four live settings).
    pub fn from_params(params: &ParameterSnapshot) -> Self {
        let seed = params.int("seed", i64::from(DEFAULT_SEED));
        let settings = FractalSettings::default().resolve(params);
        Self::new(u32::try_from(seed).unwrap_or(DEFAULT_SEED), settings)
    }

    /// Parameters accepted by this source.
    pub fn parameters() -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::seed(),
            ParameterDefinition::int("octaves", 4, 8, 4)
                .with_display("Octaves")
                .with_description("Number of noise layers"),
            ParameterDefinition::float("persistence", 0.5, 0.8, 0.5)
                .with_display("Persistence")
                .with_description("Weight kept from one layer to the next"),
            ParameterDefinition::float("lacunarity", 1.0, 4.0, 2.0)
                .with_display("Lacunarity")
                .with_description("Frequency growth from one layer to the next"),
            ParameterDefinition::float("scale", 0.1, 10.0, 1.0)
                .with_display("Scale")
                .with_description("Starting layer frequency"),
        ]
    }

    /// Current settings.
    pub fn settings(&self) -> FractalSettings {
        self.settings
    }

    /// Raw samples drawn for a layer at `frequency`, given the top layer frequency.
    fn layer_len(frames: usize, frequency: f32, top: f32) -> usize {
        let fraction = (frequency / top).min(1.0);
        let len = (frames as f32 * fraction).ceil() as usize;
        len.clamp(frames.min(2), frames)
    }
}

/// Stretch `src` over `dst` by linear interpolation, endpoints aligned.
fn stretch_add(src: &[f32], dst: &mut [f32], weight: f32) {
    let n = dst.len();
    if src.len() == n {
        for (d, s) in dst.iter_mut().zip(src) {
            *d += s * weight;
        }
        return;
    }
    if src.len() == 1 || n == 1 {
        let value = src.first().copied().unwrap_or(0.0) * weight;
        for d in dst.iter_mut() {
            *d += value;
        }
        return;
    }

    let step = (src.len() - 1) as f32 / (n - 1) as f32;
    for (i, d) in dst.iter_mut().enumerate() {
        let pos = i as f32 * step;
        let idx = (pos as usize).min(src.len() - 2);
        let frac = pos - idx as f32;
        let value = src[idx] + (src[idx + 1] - src[idx]) * frac;
        *d += value * weight;
    }
}

impl NoiseSource for FractalNoise {
    fn generate_into(&mut self, out: &mut [f32]) {
        let frames = out.len();
        out.fill(0.0);
        if frames == 0 {
            return;
        }
        if self.raw.len() < frames {
            self.raw.resize(frames, 0.0);
        }

        let FractalSettings {
            octaves,
            persistence,
            lacunarity,
            scale,
        } = self.settings;
        let top = powf(lacunarity, octaves.saturating_sub(1) as f32);

        let mut amplitude = 1.0f32;
        let mut frequency = scale;
        for _ in 0..octaves {
            let len = Self::layer_len(frames, frequency, top);
            let raw = &mut self.raw[..len];
            self.base.generate_into(raw);
            stretch_add(raw, out, amplitude);

            amplitude *= persistence;
            frequency *= lacunarity;
        }

        let max = peak(out);
        if max > 0.0 {
            let inv = 1.0 / max;
            for sample in out.iter_mut() {
                *sample = (*sample * inv).clamp(-1.0, 1.0);
            }
        }
    }

    fn update(&mut self, params: &ParameterSnapshot) {
        self.settings = self.settings.resolve(params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let mut a = FractalNoise::new(12345, FractalSettings::default());
        let mut b = FractalNoise::new(12345, FractalSettings::default());
        assert_eq!(a.generate(1024), b.generate(1024));
    }

    #[test]
    fn test_normalized_to_unit_peak() {
        let mut noise = FractalNoise::new(3, FractalSettings::default());
        let block = noise.generate(2048);
        let max = peak(&block);
        assert!((max - 1.0).abs() < 1e-6, "peak should be 1.0, got {max}");
    }

    #[test]
    fn test_single_octave_flat_lacunarity_matches_base() {
        let settings = FractalSettings {
            octaves: 1,
            persistence: 0.5,
            lacunarity: 1.0,
            scale: 1.0,
        };
        let mut fractal = FractalNoise::new(9, settings);
        let mut base = XorShiftNoise::new(9);

        let out = fractal.generate(64);
        let raw = base.generate(64);
        let max = peak(&raw);
        for (f, r) in out.iter().zip(&raw) {
            assert!((f - r / max).abs() < 1e-6);
        }
    }

    #[test]
    fn test_layer_len() {
        assert_eq!(FractalNoise::layer_len(1024, 8.0, 8.0), 1024);
        assert_eq!(FractalNoise::layer_len(1024, 1.0, 8.0), 128);
        assert_eq!(FractalNoise::layer_len(1024, 1e-6, 8.0), 2);
        assert_eq!(FractalNoise::layer_len(1, 0.5, 8.0), 1);
    }

    #[test]
    fn test_lower_scale_is_smoother() {
        // mean absolute sample-to-sample difference drops with coarser layers
        fn roughness(block: &[f32]) -> f32 {
            block.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>() / block.len() as f32
        }

        let mut rough = FractalNoise::new(5, FractalSettings::default());
        let mut smooth = FractalNoise::new(
            5,
            FractalSettings {
                scale: 0.1,
                ..FractalSettings::default()
            },
        );
        assert!(roughness(&smooth.generate(4096)) < roughness(&rough.generate(4096)));
    }

    #[test]
    fn test_update_changes_settings() {
        let mut noise = FractalNoise::new(1, FractalSettings::default());
        noise.update(&ParameterSnapshot::new().with("octaves", 6).with("seed", 99));
        assert_eq!(noise.settings().octaves, 6);
        assert_eq!(noise.settings().persistence, 0.5);
    }

    #[test]
    fn test_empty_block() {
        let mut noise = FractalNoise::new(1, FractalSettings::default());
        assert!(noise.generate(0).is_empty());
    }
}
