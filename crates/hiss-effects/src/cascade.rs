//! Cascaded one-pole low-pass with resonance.
//!
//! One implementation covers every cascade variant, configured along two axes:
//!
//! - [`CoefficientMapping`]: how the normalized cutoff becomes per-pole
//!   coefficients (`linear`: `0.001 + cutoff * 0.099` for every pole;
//!   `cubic`: `0.001 + cutoff^3 * 0.999`, divided by 5 for each further pole).
//! - [`FeedbackPolicy`]: how resonance is fed back.
//!
//! # Plain feedback
//!
//! The final pole's previous output is added to that pole's input:
//!
//! ```text
//! u = x + feedback * y_final[n-1]
//! feedback = resonance * (0.9 + 0.01 * (poles - 1))
//! ```
//!
//! This raises the final pole towards unity, boosting low frequencies as
//! resonance grows. The loop gain stays below one, so the filter is always
//! stable and silent input stays silent.
//!
//! # Self-oscillating feedback
//!
//! The final pole's previous output is soft clipped, inverted, and fed into
//! the head of the cascade (a ladder loop):
//!
//! ```text
//! u = x - tanh(k * y_final[n-1]) + excitation
//! k = resonance * 1.25 * k_crit
//! ```
//!
//! `k_crit` is the loop gain at which the cascade, including the one-sample
//! feedback delay, has unity gain where its phase reaches −180°
//! ([`critical_gain`]). At full resonance the loop gain is 25% above that
//! point, so the filter oscillates on its own; the `tanh` limits the
//! amplitude. A −100 dBFS xorshift excitation scaled by resonance lets the
//! oscillation build from exact digital silence. With one or two poles the
//! phase only reaches −180° at Nyquist, which is where those settings ring.
//!
//! # Output stage
//!
//! After the cascade each block has its mean removed, with an optional
//! windowed trend pass, and is gain-compensated and scaled by volume. Plain
//! output is rescaled when the gain would push it past unity, so it is never
//! clipped. Self-oscillating output is soft clipped, has its mean removed once
//! more and is rescaled if it still exceeds unity.

use crate::xorshift::{next_state, state_to_sample};
use hiss_core::{
    FilterStage, OnePole, ParameterDefinition, ParameterSnapshot, TrendRemover, ValidationError,
    ValidationResult, clamp_block, linear_alpha, peak, remove_mean, soft_clip,
};
use libm::powf;

/// Highest supported pole count.
pub const MAX_POLES: usize = 4;

/// Feedback ceiling for [`FeedbackPolicy::Plain`] with one pole.
const PLAIN_MAX_FEEDBACK: f32 = 0.9;

/// Extra feedback ceiling per additional pole.
const PLAIN_FEEDBACK_PER_POLE: f32 = 0.01;

/// Loop gain at full resonance relative to the critical gain.
const SELF_OSC_MARGIN: f32 = 1.25;

/// Excitation level at full resonance (−100 dBFS).
const NOISE_FLOOR: f32 = 1e-5;

/// How a normalized cutoff maps to per-pole coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoefficientMapping {
    /// `0.001 + cutoff * 0.099`, identical for every pole.
    Linear,
    /// `0.001 + cutoff^3 * 0.999`, divided by `5^p` for pole `p`.
    Cubic,
}

impl CoefficientMapping {
    /// Names accepted by the `mapping` parameter.
    pub const CHOICES: &'static [&'static str] = &["linear", "cubic"];

    /// Parameter value for this mapping.
    pub const fn name(&self) -> &'static str {
        match self {
            CoefficientMapping::Linear => "linear",
            CoefficientMapping::Cubic => "cubic",
        }
    }

    /// Look up a mapping by parameter value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "linear" => Some(CoefficientMapping::Linear),
            "cubic" => Some(CoefficientMapping::Cubic),
            _ => None,
        }
    }

    /// Coefficient for pole `index` (0-based).
    pub fn alpha(&self, cutoff: f32, index: usize) -> f32 {
        match self {
            CoefficientMapping::Linear => linear_alpha(cutoff),
            CoefficientMapping::Cubic => {
                let c = cutoff.clamp(0.0, 1.0);
                (0.001 + c * c * c * 0.999) / powf(5.0, index as f32)
            }
        }
    }
}

/// How resonance is fed back around the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackPolicy {
    /// Positive feedback into the final pole, always below unity loop gain.
    Plain,
    /// Inverted, soft-clipped ladder feedback that can exceed unity loop gain.
    SelfOscillating,
}

/// Settings read by [`CascadedLowPass`] on every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeSettings {
    /// Normalized cutoff (0–1).
    pub cutoff: f32,
    /// Resonance (0–1).
    pub resonance: f32,
    /// Pole count; only 1–4 are accepted at process time.
    pub poles: i64,
    /// Output level (0–1).
    pub volume: f32,
    /// Cutoff to coefficient mapping.
    pub mapping: CoefficientMapping,
    /// Apply windowed trend removal after the mean pass.
    pub trend_removal: bool,
}

impl CascadeSettings {
    /// Read settings from `params`, falling back to `self` for missing keys.
    ///
    /// Unknown mapping names keep the current mapping.
    pub fn resolve(&self, params: &ParameterSnapshot) -> Self {
        Self {
            mapping: CoefficientMapping::from_name(params.text("mapping", self.mapping.name()))
                .unwrap_or(self.mapping),
            trend_removal: params.boolean("trend_removal", self.trend_removal),
            ..self.resolve_core(params)
        }
    }

    /// Like [`resolve`](Self::resolve) but ignores `mapping` and `trend_removal`.
    pub fn resolve_core(&self, params: &ParameterSnapshot) -> Self {
        Self {
            cutoff: params.float("cutoff", self.cutoff),
            resonance: params.float("resonance", self.resonance).clamp(0.0, 1.0),
            poles: params.int("poles", self.poles),
            volume: params.float("volume", self.volume),
            ..*self
        }
    }
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            cutoff: 0.5,
            resonance: 0.0,
            poles: 1,
            volume: 1.0,
            mapping: CoefficientMapping::Linear,
            trend_removal: false,
        }
    }
}

/// Plain feedback ceiling, rising slightly with the pole count.
fn plain_max_feedback(poles: usize) -> f32 {
    PLAIN_MAX_FEEDBACK + PLAIN_FEEDBACK_PER_POLE * (poles - 1) as f32
}

/// Check a pole count, returning it as an index bound.
pub fn validate_poles(poles: i64) -> ValidationResult<usize> {
    match usize::try_from(poles) {
        Ok(p @ 1..=MAX_POLES) => Ok(p),
        _ => Err(ValidationError::InvalidPoleCount(poles)),
    }
}

/// Loop gain at which a cascade of one-pole stages with the given
/// coefficients, closed through a one-sample delay and an inversion, sits
/// on the edge of oscillation.
///
/// Finds the lowest frequency where the loop phase reaches −180° and returns
/// the reciprocal of the loop magnitude there. With one or two poles that
/// frequency is Nyquist, where the result is `∏ (2 - a) / a`.
pub fn critical_gain(alphas: &[f32]) -> f32 {
    fn phase(alphas: &[f32], w: f64) -> f64 {
        let (sin, cos) = w.sin_cos();
        alphas.iter().fold(-w, |acc, &a| {
            let r = 1.0 - f64::from(a);
            acc - (r * sin).atan2(1.0 - r * cos)
        })
    }

    fn magnitude(alphas: &[f32], w: f64) -> f64 {
        let (sin, cos) = w.sin_cos();
        alphas.iter().fold(1.0, |acc, &a| {
            let r = 1.0 - f64::from(a);
            acc * f64::from(a) / (1.0 - r * cos).hypot(r * sin)
        })
    }

    const STEPS: usize = 256;
    const TOLERANCE: f64 = 1e-9;
    let below = |w: f64| phase(alphas, w) + std::f64::consts::PI <= TOLERANCE;

    let mut lo = 0.0;
    let mut hi = std::f64::consts::PI;
    for i in 1..=STEPS {
        let w = std::f64::consts::PI * i as f64 / STEPS as f64;
        if below(w) {
            hi = w;
            break;
        }
        lo = w;
    }
    for _ in 0..40 {
        let mid = 0.5 * (lo + hi);
        if below(mid) {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    (1.0 / magnitude(alphas, hi)) as f32
}

/// Cascaded one-pole low-pass filter.
///
/// Holds up to four stages; their outputs persist between blocks and are the
/// filter's memory. Stages beyond the current pole count keep their last
/// state and resume from it if the count goes back up.
///
/// ## Parameters
///
/// | Name | Range | Default | Policy |
/// |------|-------|---------|--------|
/// | `cutoff` | 0–1 | 0.5 | both |
/// | `resonance` | 0–1 | 0.0 | both |
/// | `poles` | 1–4 | 1 | both |
/// | `volume` | 0–1 | 0.5 | both |
/// | `mapping` | linear, cubic | linear | self-oscillating |
/// | `trend_removal` | bool | false | self-oscillating |
///
/// A pole count outside 1–4 is rejected before any state changes.
///
/// # Example
///
/// ```rust
/// use hiss_core::{FilterStage, ParameterSnapshot};
/// use hiss_effects::CascadedLowPass;
///
/// let mut filter = CascadedLowPass::lowpass();
/// let params = ParameterSnapshot::new().with("poles", 3).with("resonance", 0.4);
/// let out = filter.process(&[0.5, -0.5, 0.25, -0.25], &params).unwrap();
/// assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
///
/// let bad = ParameterSnapshot::new().with("poles", 5);
/// assert!(filter.process(&[0.0; 4], &bad).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CascadedLowPass {
    policy: FeedbackPolicy,
    settings: CascadeSettings,
    stages: [OnePole; MAX_POLES],
    excitation: u32,
    trend: TrendRemover,
    loop_key: Option<(u32, usize, CoefficientMapping)>,
    loop_gain: f32,
}

impl CascadedLowPass {
    /// Create a filter with zeroed history.
    pub fn new(policy: FeedbackPolicy, settings: CascadeSettings) -> Self {
        Self {
            policy,
            settings,
            stages: core::array::from_fn(|_| OnePole::default()),
            excitation: 0x9E37_79B9,
            trend: TrendRemover::default(),
            loop_key: None,
            loop_gain: 0.0,
        }
    }

    /// Linear mapping with plain feedback.
    pub fn lowpass() -> Self {
        Self::new(FeedbackPolicy::Plain, CascadeSettings::default())
    }

    /// Self-oscillating variant with default settings.
    pub fn resonant() -> Self {
        Self::new(FeedbackPolicy::SelfOscillating, CascadeSettings::default())
    }

    /// Create a filter whose fallback settings come from `params`.
    pub fn from_params(policy: FeedbackPolicy, params: &ParameterSnapshot) -> Self {
        let settings = match policy {
            FeedbackPolicy::Plain => CascadeSettings::default().resolve_core(params),
            FeedbackPolicy::SelfOscillating => CascadeSettings::default().resolve(params),
        };
        Self::new(policy, settings)
    }

    /// Parameters read under `policy`.
    pub fn parameters(policy: FeedbackPolicy) -> Vec<ParameterDefinition> {
        let mut params = vec![
            ParameterDefinition::cutoff(),
            ParameterDefinition::resonance(),
            ParameterDefinition::poles(),
            ParameterDefinition::volume(),
        ];
        if policy == FeedbackPolicy::SelfOscillating {
            params.push(
                ParameterDefinition::enumeration("mapping", CoefficientMapping::CHOICES, "linear")
                    .with_display("Cutoff Mapping")
                    .with_description("Linear or cubic cutoff to coefficient curve"),
            );
            params.push(
                ParameterDefinition::boolean("trend_removal", false)
                    .with_display("Trend Removal")
                    .with_description("Subtract a 64-sample moving average after the cascade"),
            );
        }
        params
    }

    /// Feedback policy.
    pub fn policy(&self) -> FeedbackPolicy {
        self.policy
    }

    /// Settings used when a snapshot omits a parameter.
    pub fn settings(&self) -> CascadeSettings {
        self.settings
    }

    /// Previous output of each stage, indexed by pole position.
    pub fn history(&self) -> [f32; MAX_POLES] {
        core::array::from_fn(|p| self.stages[p].last())
    }

    fn resolve(&self, params: &ParameterSnapshot) -> CascadeSettings {
        match self.policy {
            FeedbackPolicy::Plain => self.settings.resolve_core(params),
            FeedbackPolicy::SelfOscillating => self.settings.resolve(params),
        }
    }

    /// Critical loop gain for the current coefficients, cached per setting.
    fn critical_gain_for(&mut self, settings: &CascadeSettings, poles: usize) -> f32 {
        let key = (settings.cutoff.to_bits(), poles, settings.mapping);
        if self.loop_key != Some(key) {
            let alphas: [f32; MAX_POLES] =
                core::array::from_fn(|p| settings.mapping.alpha(settings.cutoff, p));
            self.loop_gain = critical_gain(&alphas[..poles]);
            self.loop_key = Some(key);
        }
        self.loop_gain
    }

    fn run_plain(&mut self, block: &mut [f32], settings: &CascadeSettings, poles: usize) -> f32 {
        let feedback = settings.resonance * plain_max_feedback(poles);
        let last = poles - 1;

        for sample in block.iter_mut() {
            let mut signal = *sample;
            for (p, stage) in self.stages[..poles].iter_mut().enumerate() {
                let input = if p == last {
                    signal + feedback * stage.last()
                } else {
                    signal
                };
                signal = stage.process(input);
            }
            *sample = signal;
        }

        (1.5 + 0.2 * (poles - 1) as f32) * (1.0 - 0.3 * feedback)
    }

    fn run_self_oscillating(
        &mut self,
        block: &mut [f32],
        settings: &CascadeSettings,
        poles: usize,
    ) -> f32 {
        let k = settings.resonance * SELF_OSC_MARGIN * self.critical_gain_for(settings, poles);
        let excite = NOISE_FLOOR * settings.resonance;
        let last = poles - 1;

        for sample in block.iter_mut() {
            self.excitation = next_state(self.excitation);
            let dither = state_to_sample(self.excitation) * excite;
            let feedback = soft_clip(k * self.stages[last].last());

            let mut signal = *sample - feedback + dither;
            for stage in self.stages[..poles].iter_mut() {
                signal = stage.process(signal);
            }
            *sample = signal;
        }

        (1.0 + 0.05 * poles as f32) * (1.0 + k)
    }
}

impl FilterStage for CascadedLowPass {
    fn process_in_place(
        &mut self,
        block: &mut [f32],
        params: &ParameterSnapshot,
    ) -> ValidationResult<()> {
        let settings = self.resolve(params);
        let poles = validate_poles(settings.poles)?;

        for (p, stage) in self.stages.iter_mut().enumerate() {
            stage.set_alpha(settings.mapping.alpha(settings.cutoff, p));
        }

        let gain = match self.policy {
            FeedbackPolicy::Plain => self.run_plain(block, &settings, poles),
            FeedbackPolicy::SelfOscillating => self.run_self_oscillating(block, &settings, poles),
        };

        remove_mean(block);
        if settings.trend_removal {
            self.trend.process(block);
        }

        match self.policy {
            FeedbackPolicy::Plain => {
                // a hard clip would bring the offset back
                let max = peak(block) * gain;
                let out_gain = if max > 1.0 {
                    gain * settings.volume / max
                } else {
                    gain * settings.volume
                };
                for sample in block.iter_mut() {
                    *sample *= out_gain;
                }
            }
            FeedbackPolicy::SelfOscillating => {
                for sample in block.iter_mut() {
                    *sample = soft_clip(*sample * gain);
                }
                remove_mean(block);
                // rescale rather than clip so the block stays zero-mean
                let max = peak(block);
                let out_gain = if max > 1.0 {
                    settings.volume / max
                } else {
                    settings.volume
                };
                for sample in block.iter_mut() {
                    *sample *= out_gain;
                }
            }
        }
        clamp_block(block);
        Ok(())
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }
}
