//! Three-band equalizer
//!
//! High shelf, mid peak and low shelf biquads in series. Coefficients are
//! computed in f64 from the Audio EQ Cookbook formulas; shelves use a fixed
//! Q of 1.0.

use super::{AudioBuffer, ProcessSpec, Stage};
use crate::impl_stage_common;
use crate::mapper::AudioParameters;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Q used by both shelving bands
pub const SHELF_Q: f64 = 1.0;

/// Frequencies a flattened equalizer returns to
pub const FLAT_HIGH_SHELF_FREQ: f32 = 10000.0;
pub const FLAT_MID_FREQ: f32 = 1000.0;
pub const FLAT_LOW_SHELF_FREQ: f32 = 100.0;

/// Band position in the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandKind {
    HighShelf,
    MidPeak,
    LowShelf,
}

impl BandKind {
    fn index(self) -> usize {
        match self {
            BandKind::HighShelf => 0,
            BandKind::MidPeak => 1,
            BandKind::LowShelf => 2,
        }
    }
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Pass-through coefficients
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Calculate coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    ///
    /// A 0 dB gain yields exact identity coefficients.
    pub fn calculate(kind: BandKind, sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        if gain_db == 0.0 {
            return Self::identity();
        }

        // Clamp frequency below Nyquist
        let freq = frequency.clamp(10.0, sample_rate / 2.0 - 1.0);
        let q = q.clamp(0.1, 10.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match kind {
            BandKind::MidPeak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            BandKind::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            BandKind::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        // Normalize by a0
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Biquad filter memory for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Direct Form I
    #[inline]
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn is_silent(&self) -> bool {
        self.x1 == 0.0 && self.x2 == 0.0 && self.y1 == 0.0 && self.y2 == 0.0
    }
}

/// Settings and coefficients of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub kind: BandKind,
    pub frequency: f32,
    pub gain_db: f32,
    pub q: f32,
    coeffs: BiquadCoeffs,
}

impl Band {
    fn flat(kind: BandKind, frequency: f32) -> Self {
        Self {
            kind,
            frequency,
            gain_db: 0.0,
            q: SHELF_Q as f32,
            coeffs: BiquadCoeffs::identity(),
        }
    }

    fn recalculate(&mut self, sample_rate: f64) {
        self.coeffs = BiquadCoeffs::calculate(
            self.kind,
            sample_rate,
            self.frequency as f64,
            self.gain_db as f64,
            self.q as f64,
        );
    }

    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }
}

/// Three-band equalizer stage
#[derive(Debug, Clone)]
pub struct Equalizer {
    bands: [Band; 3],
    /// Per-channel filter memory, one state per band
    states: Vec<[BiquadState; 3]>,
    spec: Option<ProcessSpec>,
    sample_rate: f64,
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Equalizer {
    /// Create a flat equalizer sized for the default stereo spec
    pub fn new() -> Self {
        let spec = ProcessSpec::default();
        Self {
            bands: Self::flat_bands(),
            states: vec![[BiquadState::default(); 3]; spec.num_channels],
            spec: None,
            sample_rate: spec.sample_rate,
        }
    }

    fn flat_bands() -> [Band; 3] {
        [
            Band::flat(BandKind::HighShelf, FLAT_HIGH_SHELF_FREQ),
            Band::flat(BandKind::MidPeak, FLAT_MID_FREQ),
            Band::flat(BandKind::LowShelf, FLAT_LOW_SHELF_FREQ),
        ]
    }

    pub fn set_high_shelf(&mut self, frequency: f32, gain_db: f32) {
        self.set_band(BandKind::HighShelf, frequency, gain_db, SHELF_Q as f32);
    }

    /// Q is clamped to [0.1, 10]
    pub fn set_mid_peak(&mut self, frequency: f32, gain_db: f32, q: f32) {
        self.set_band(BandKind::MidPeak, frequency, gain_db, q.clamp(0.1, 10.0));
    }

    pub fn set_low_shelf(&mut self, frequency: f32, gain_db: f32) {
        self.set_band(BandKind::LowShelf, frequency, gain_db, SHELF_Q as f32);
    }

    fn set_band(&mut self, kind: BandKind, frequency: f32, gain_db: f32, q: f32) {
        let band = &mut self.bands[kind.index()];
        band.frequency = frequency;
        band.gain_db = gain_db;
        band.q = q;
        band.recalculate(self.sample_rate);
    }

    /// Set every band to 0 dB without touching filter memory
    pub fn flatten(&mut self) {
        self.bands = Self::flat_bands();
    }

    pub fn band(&self, kind: BandKind) -> &Band {
        &self.bands[kind.index()]
    }

    pub fn coefficients(&self, kind: BandKind) -> BiquadCoeffs {
        self.bands[kind.index()].coeffs
    }

    pub fn is_flat(&self) -> bool {
        self.bands.iter().all(|b| b.coeffs.is_identity())
    }

    /// True when no channel holds filter history
    pub fn is_silent(&self) -> bool {
        self.states.iter().flatten().all(BiquadState::is_silent)
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn clear_memory(&mut self) {
        for channel in &mut self.states {
            *channel = [BiquadState::default(); 3];
        }
    }
}

impl Stage for Equalizer {
    fn prepare(&mut self, spec: ProcessSpec) {
        if self.spec == Some(spec) {
            return;
        }

        self.states = vec![[BiquadState::default(); 3]; spec.num_channels];
        self.spec = Some(spec);
        self.set_sample_rate(spec.sample_rate);
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        if let Some(spec) = self.spec.as_mut() {
            spec.sample_rate = sample_rate;
        }
        for band in &mut self.bands {
            band.recalculate(sample_rate);
        }
    }

    fn reset(&mut self) {
        self.flatten();
        self.clear_memory();
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        let channels = buffer.num_channels().min(self.states.len());
        for ch in 0..channels {
            let state = &mut self.states[ch];
            for sample in buffer.channel_mut(ch).iter_mut() {
                let mut x = *sample as f64;
                // Flat bands still run so their history tracks the input
                for (band, band_state) in self.bands.iter().zip(state.iter_mut()) {
                    x = band_state.process(x, &band.coeffs);
                }
                *sample = x as f32;
            }
        }
    }

    fn apply(&mut self, params: &AudioParameters) {
        let eq = &params.eq;
        self.flatten();
        self.set_high_shelf(eq.high_shelf_freq, eq.high_shelf_gain);
        self.set_mid_peak(eq.mid_freq, eq.mid_gain, eq.mid_q);
        self.set_low_shelf(eq.low_shelf_freq, eq.low_shelf_gain);
    }

    fn is_enabled(&self) -> bool {
        !self.is_flat()
    }

    impl_stage_common!("eq", "Equalizer");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn prepared() -> Equalizer {
        let mut eq = Equalizer::new();
        eq.prepare(ProcessSpec::new(44100.0, 512, 2));
        eq
    }

    #[test]
    fn test_zero_gain_is_identity() {
        let coeffs = BiquadCoeffs::calculate(BandKind::HighShelf, 48000.0, 8000.0, 0.0, 1.0);
        assert!(coeffs.is_identity());

        let coeffs = BiquadCoeffs::calculate(BandKind::MidPeak, 48000.0, 800.0, 2.0, 1.0);
        assert!(!coeffs.is_identity());
    }

    #[test]
    fn test_flat_eq_is_transparent() {
        let mut eq = prepared();
        let mut buffer = AudioBuffer::sine(440.0, 0.5, 2, 512, 44100.0);
        let original = buffer.clone();

        eq.process(&mut buffer);

        assert_eq!(buffer, original);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut eq = prepared();
        eq.set_high_shelf(8000.0, 4.0);
        eq.set_mid_peak(800.0, 2.0, 1.0);

        eq.reset();
        let once: Vec<_> = [BandKind::HighShelf, BandKind::MidPeak, BandKind::LowShelf]
            .iter()
            .map(|k| eq.coefficients(*k))
            .collect();
        eq.reset();
        let twice: Vec<_> = [BandKind::HighShelf, BandKind::MidPeak, BandKind::LowShelf]
            .iter()
            .map(|k| eq.coefficients(*k))
            .collect();

        assert_eq!(once, twice);
        assert!(eq.is_flat());
        assert_eq!(eq.band(BandKind::MidPeak).frequency, FLAT_MID_FREQ);
    }

    #[test]
    fn test_setter_only_touches_its_band() {
        let mut eq = prepared();
        eq.set_low_shelf(100.0, 4.0);
        let low = eq.coefficients(BandKind::LowShelf);

        eq.set_high_shelf(10000.0, -1.5);

        assert_eq!(eq.coefficients(BandKind::LowShelf), low);
        assert!(eq.coefficients(BandKind::MidPeak).is_identity());
    }

    #[test]
    fn test_low_shelf_boost_raises_low_tone() {
        let mut eq = prepared();
        eq.set_low_shelf(100.0, 6.0);

        let mut buffer = AudioBuffer::sine(40.0, 0.25, 1, 44100, 44100.0);
        let before = buffer.rms_db(0);
        eq.process(&mut buffer);
        let after = buffer.rms_db(0);

        // Well below the corner the shelf approaches its full gain
        assert_relative_eq!(after - before, 6.0, epsilon = 1.0);
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let mut eq = prepared();
        eq.set_mid_peak(1000.0, 6.0, 1.0);
        let mut buffer = AudioBuffer::sine(1000.0, 0.5, 2, 256, 44100.0);
        eq.process(&mut buffer);
        assert!(!eq.is_silent());

        eq.prepare(ProcessSpec::new(44100.0, 512, 2));
        assert!(!eq.is_silent());

        eq.prepare(ProcessSpec::new(48000.0, 512, 2));
        assert!(eq.is_silent());
        // Bands survive a rate change
        assert_eq!(eq.band(BandKind::MidPeak).gain_db, 6.0);
        assert!(!eq.coefficients(BandKind::MidPeak).is_identity());
    }

    #[test]
    fn test_prepare_after_rate_change_restores_rate() {
        let mut eq = prepared();
        eq.set_high_shelf(8000.0, 4.0);

        eq.set_sample_rate(96000.0);
        eq.prepare(ProcessSpec::new(44100.0, 512, 2));

        assert_eq!(eq.sample_rate(), 44100.0);
        assert_eq!(
            eq.coefficients(BandKind::HighShelf),
            BiquadCoeffs::calculate(BandKind::HighShelf, 44100.0, 8000.0, 4.0, SHELF_Q)
        );
    }

    #[test]
    fn test_flat_band_history_follows_input() {
        let mut eq = prepared();
        let mut buffer = AudioBuffer::sine(440.0, 0.5, 1, 64, 44100.0);
        eq.process(&mut buffer);
        let last = buffer.channel(0)[63] as f64;

        let state = eq.states[0][BandKind::LowShelf.index()];
        assert_eq!(state.x1, last);
        assert_eq!(state.y1, last);
    }

    #[test]
    fn test_q_and_frequency_are_clamped() {
        let mut eq = prepared();
        eq.set_mid_peak(30000.0, 3.0, 0.0);
        assert_eq!(eq.band(BandKind::MidPeak).q, 0.1);

        let mut buffer = AudioBuffer::sine(1000.0, 0.5, 2, 1024, 44100.0);
        eq.process(&mut buffer);
        assert!(buffer.is_finite());
    }

    #[test]
    fn test_apply_flattens_untouched_bands() {
        let mut eq = prepared();
        eq.set_low_shelf(100.0, 4.0);

        let mut params = AudioParameters::default();
        params.eq.high_shelf_gain = 2.5;
        params.eq.high_shelf_freq = 8000.0;
        eq.apply(&params);

        assert!(eq.coefficients(BandKind::LowShelf).is_identity());
        assert!(!eq.coefficients(BandKind::HighShelf).is_identity());
    }
}
