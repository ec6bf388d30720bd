//! One-pole high-pass into one-pole low-pass band filter.

use hiss_core::{
    FilterStage, OnePole, OnePoleHighPass, ParameterDefinition, ParameterSnapshot,
    ValidationResult, linear_alpha,
};

/// Settings read by [`Bandpass`] on every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandpassSettings {
    /// Normalized center (0–1).
    pub cutoff: f32,
    /// Normalized width (0–1).
    pub bandwidth: f32,
    /// Output level (0–1).
    pub volume: f32,
}

impl BandpassSettings {
    /// Read settings from `params`, falling back to `self` for missing keys.
    pub fn resolve(&self, params: &ParameterSnapshot) -> Self {
        Self {
            cutoff: params.float("cutoff", self.cutoff),
            bandwidth: params.float("bandwidth", self.bandwidth),
            volume: params.float("volume", self.volume),
        }
    }

    /// Corner coefficients `(high_alpha, low_alpha)`.
    ///
    /// ```text
    /// base  = 0.001 + cutoff * 0.099
    /// high  = min(0.1,   base + bandwidth * 0.05)
    /// low   = max(0.001, base - bandwidth * 0.05)
    /// ```
    pub fn coefficients(&self) -> (f32, f32) {
        let base = linear_alpha(self.cutoff);
        let spread = self.bandwidth.clamp(0.0, 1.0) * 0.05;
        ((base + spread).min(0.1), (base - spread).max(0.001))
    }

    /// Makeup gain: `1.5 + 0.2 * (1 - bandwidth)`.
    pub fn gain(&self) -> f32 {
        1.5 + 0.2 * (1.0 - self.bandwidth.clamp(0.0, 1.0))
    }
}

impl Default for BandpassSettings {
    /// Volume defaults to unity inside the filter; the store's `volume`
    /// default (0.5) applies whenever a snapshot carries it.
    fn default() -> Self {
        Self {
            cutoff: 0.5,
            bandwidth: 0.5,
            volume: 1.0,
        }
    }
}

/// Band filter built from a one-pole high-pass followed by a one-pole low-pass.
///
/// Per sample:
///
/// ```text
/// hp[n] = x[n] - x[n-1] + (1 - high) * hp[n-1]
/// lp[n] = low * hp[n] + (1 - low) * lp[n-1]
/// y[n]  = clamp(lp[n] * gain * volume, -1, 1)
/// ```
///
/// The narrower the band, the larger both the pass region of the two stages
/// and the makeup gain, so narrow settings come out louder than wide ones.
///
/// ## Parameters
///
/// | Name | Range | Default |
/// |------|-------|---------|
/// | `cutoff` | 0–1 | 0.5 |
/// | `bandwidth` | 0–1 | 0.5 |
/// | `volume` | 0–1 | 0.5 |
///
/// # Example
///
/// ```rust
/// use hiss_core::{FilterStage, ParameterSnapshot};
/// use hiss_effects::Bandpass;
///
/// let mut filter = Bandpass::default();
/// let out = filter.process(&[1.0, -1.0, 1.0, -1.0], &ParameterSnapshot::new()).unwrap();
/// assert_eq!(out.len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct Bandpass {
    settings: BandpassSettings,
    highpass: OnePoleHighPass,
    lowpass: OnePole,
}

impl Bandpass {
    /// Create a filter with zeroed history.
    pub fn new(settings: BandpassSettings) -> Self {
        let (high, low) = settings.coefficients();
        Self {
            settings,
            highpass: OnePoleHighPass::new(high),
            lowpass: OnePole::new(low),
        }
    }

    /// Create a filter whose fallback settings come from `params`.
    pub fn from_params(params: &ParameterSnapshot) -> Self {
        Self::new(BandpassSettings::default().resolve(params))
    }

    /// Parameters read by this filter.
    pub fn parameters() -> Vec<ParameterDefinition> {
        vec![
            ParameterDefinition::cutoff(),
            ParameterDefinition::bandwidth(),
            ParameterDefinition::volume(),
        ]
    }

    /// Settings used when a snapshot omits a parameter.
    pub fn settings(&self) -> BandpassSettings {
        self.settings
    }
}

impl Default for Bandpass {
    fn default() -> Self {
        Self::new(BandpassSettings::default())
    }
}

impl FilterStage for Bandpass {
    fn process_in_place(
        &mut self,
        block: &mut [f32],
        params: &ParameterSnapshot,
    ) -> ValidationResult<()> {
        let settings = self.settings.resolve(params);
        let (high, low) = settings.coefficients();
        self.highpass.set_alpha(high);
        self.lowpass.set_alpha(low);
        let out_gain = settings.gain() * settings.volume;

        for sample in block.iter_mut() {
            let hp = self.highpass.process(*sample);
            let lp = self.lowpass.process(hp);
            *sample = (lp * out_gain).clamp(-1.0, 1.0);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
    }
}
