//! Compressor stage
//!
//! Feed-forward, level-based dynamics processor. Stereo detection is linked:
//! one envelope follows the loudest channel of each frame and the same gain
//! is applied to every channel.

use super::{AudioBuffer, ProcessSpec, Stage};
use crate::engine::buffer::{db_to_linear, linear_to_db};
use crate::impl_stage_common;
use crate::mapper::AudioParameters;

/// Envelope level below which no gain is computed
pub const ENVELOPE_FLOOR: f32 = 1e-9;

/// One-pole smoothing coefficient for a time constant
///
/// `exp(-1 / (ms * 0.001 * sr))`, or 0 (instant) for non-positive times.
pub fn time_coefficient(time_ms: f32, sample_rate: f64) -> f32 {
    let samples = time_ms as f64 * 0.001 * sample_rate;
    if samples > 0.0 {
        (-1.0 / samples).exp() as f32
    } else {
        0.0
    }
}

/// Compressor dynamics processor
#[derive(Debug, Clone)]
pub struct Compressor {
    enabled: bool,
    threshold_db: f32,
    /// Compression ratio N:1, at least 1
    ratio: f32,
    attack_ms: f32,
    release_ms: f32,
    makeup_gain_db: f32,
    sample_rate: f64,

    // Derived
    threshold_gain: f32,
    makeup_gain: f32,
    attack_coeff: f32,
    release_coeff: f32,

    // Runtime
    envelope: f32,
    /// Last applied gain reduction (linear, without makeup)
    gain_reduction: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compressor {
    /// Create a disabled compressor at unity ratio
    pub fn new() -> Self {
        let mut comp = Self {
            enabled: false,
            threshold_db: 0.0,
            ratio: 1.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_gain_db: 0.0,
            sample_rate: ProcessSpec::default().sample_rate,
            threshold_gain: 1.0,
            makeup_gain: 1.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            gain_reduction: 1.0,
        };
        comp.update_coefficients();
        comp
    }

    pub fn set_threshold_db(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db;
        self.threshold_gain = db_to_linear(threshold_db);
    }

    /// Ratios below 1 are clamped to 1
    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = if ratio.is_finite() { ratio.max(1.0) } else { 1.0 };
    }

    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms;
        self.update_coefficients();
    }

    pub fn set_release_ms(&mut self, release_ms: f32) {
        self.release_ms = release_ms;
        self.update_coefficients();
    }

    pub fn set_makeup_gain_db(&mut self, makeup_gain_db: f32) {
        self.makeup_gain_db = makeup_gain_db;
        self.makeup_gain = db_to_linear(makeup_gain_db);
    }

    /// Disabling leaves the envelope as it is, so re-enabling resumes cleanly
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn attack_coeff(&self) -> f32 {
        self.attack_coeff
    }

    pub fn release_coeff(&self) -> f32 {
        self.release_coeff
    }

    /// Current detector level (linear)
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    /// Gain reduction of the last processed frame in dB (0 or negative)
    pub fn gain_reduction_db(&self) -> f32 {
        linear_to_db(self.gain_reduction).min(0.0)
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_coefficient(self.attack_ms, self.sample_rate);
        self.release_coeff = time_coefficient(self.release_ms, self.sample_rate);
    }

    /// Advance the envelope by one detector sample and return the gain
    #[inline]
    fn next_gain(&mut self, level: f32) -> f32 {
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = level + (self.envelope - level) * coeff;

        let env = self.envelope;
        if env > self.threshold_gain && env > ENVELOPE_FLOOR {
            let over_threshold = env - self.threshold_gain;
            let compressed = self.threshold_gain + over_threshold / self.ratio;
            compressed / env
        } else {
            1.0
        }
    }
}

impl Stage for Compressor {
    fn prepare(&mut self, spec: ProcessSpec) {
        if spec.sample_rate != self.sample_rate {
            self.set_sample_rate(spec.sample_rate);
            self.envelope = 0.0;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
        self.gain_reduction = 1.0;
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.enabled {
            return;
        }

        let num_channels = buffer.num_channels();
        for frame in 0..buffer.num_samples() {
            // Linked detection
            let mut level: f32 = 0.0;
            for ch in 0..num_channels {
                level = level.max(buffer.channel(ch)[frame].abs());
            }

            let gain = self.next_gain(level);
            self.gain_reduction = gain;

            let total = gain * self.makeup_gain;
            for ch in 0..num_channels {
                buffer.channel_mut(ch)[frame] *= total;
            }
        }
    }

    fn apply(&mut self, params: &AudioParameters) {
        let comp = &params.compressor;
        self.set_threshold_db(comp.threshold_db);
        self.set_ratio(comp.ratio);
        self.set_attack_ms(comp.attack_ms);
        self.set_release_ms(comp.release_ms);
        self.set_makeup_gain_db(comp.makeup_gain_db);
        self.set_enabled(comp.enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    impl_stage_common!("compressor", "Compressor");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn punchy() -> Compressor {
        let mut comp = Compressor::new();
        comp.set_threshold_db(-12.0);
        comp.set_ratio(4.0);
        comp.set_attack_ms(3.0);
        comp.set_release_ms(60.0);
        comp.set_enabled(true);
        comp
    }

    /// Run a constant level long enough to settle and return the last output
    fn settle(comp: &mut Compressor, level: f32) -> f32 {
        let mut buffer = AudioBuffer::from_channels(vec![vec![level; 44100]; 2], 44100.0).unwrap();
        comp.reset();
        comp.process(&mut buffer);
        buffer.channel(0)[44099]
    }

    #[test]
    fn test_time_coefficient() {
        assert_relative_eq!(
            time_coefficient(10.0, 44100.0),
            (-1.0_f64 / 441.0).exp() as f32
        );
        assert_eq!(time_coefficient(0.0, 44100.0), 0.0);
        assert_eq!(time_coefficient(-5.0, 44100.0), 0.0);
    }

    #[test]
    fn test_coefficients_follow_setters() {
        let mut comp = Compressor::new();
        let before = comp.attack_coeff();
        comp.set_attack_ms(50.0);
        assert!(comp.attack_coeff() > before);

        let release = comp.release_coeff();
        comp.set_sample_rate(96000.0);
        assert!(comp.release_coeff() > release);
    }

    #[test]
    fn test_ratio_is_clamped() {
        let mut comp = Compressor::new();
        comp.set_ratio(0.25);
        assert_eq!(comp.ratio(), 1.0);
        comp.set_ratio(f32::NAN);
        assert_eq!(comp.ratio(), 1.0);
    }

    #[test]
    fn test_steady_state_gain() {
        let mut comp = punchy();
        let out = settle(&mut comp, 1.0);

        // threshold + (1 - threshold) / 4
        let threshold = db_to_linear(-12.0);
        assert_relative_eq!(out, threshold + (1.0 - threshold) / 4.0, epsilon = 1e-3);
        assert!(comp.gain_reduction_db() < 0.0);
    }

    #[test]
    fn test_gain_reduction_is_monotonic() {
        let mut comp = punchy();
        let mut last_out = 0.0;
        let mut last_gain = f32::INFINITY;

        for level in [0.3, 0.4, 0.5, 0.7, 0.9, 1.0] {
            let out = settle(&mut comp, level);
            let gain = out / level;
            assert!(out >= last_out, "output fell at level {}", level);
            assert!(gain <= last_gain + 1e-6, "gain rose at level {}", level);
            last_out = out;
            last_gain = gain;
        }
    }

    #[test]
    fn test_below_threshold_is_untouched() {
        let mut comp = punchy();
        let out = settle(&mut comp, 0.1);
        assert_relative_eq!(out, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_disabled_leaves_audio_and_envelope() {
        let mut comp = punchy();
        let mut warmup = AudioBuffer::sine(100.0, 0.9, 2, 512, 44100.0);
        comp.process(&mut warmup);
        let envelope = comp.envelope();
        assert!(envelope > 0.0);

        comp.set_enabled(false);
        let mut buffer = AudioBuffer::sine(100.0, 0.9, 2, 512, 44100.0);
        let original = buffer.clone();
        comp.process(&mut buffer);

        assert_eq!(buffer, original);
        assert_eq!(comp.envelope(), envelope);
    }

    #[test]
    fn test_silence_is_safe() {
        let mut comp = punchy();
        comp.set_threshold_db(-200.0);
        let mut buffer = AudioBuffer::new(2, 256, 44100.0);
        comp.process(&mut buffer);
        assert!(buffer.is_finite());
        assert_eq!(buffer.peak(), 0.0);
    }

    #[test]
    fn test_linked_detection_applies_same_gain() {
        let mut comp = punchy();
        let mut buffer =
            AudioBuffer::from_channels(vec![vec![1.0; 4410], vec![0.1; 4410]], 44100.0).unwrap();
        comp.process(&mut buffer);

        let left_gain = buffer.channel(0)[4409] / 1.0;
        let right_gain = buffer.channel(1)[4409] / 0.1;
        assert_relative_eq!(left_gain, right_gain, epsilon = 1e-4);
        assert!(left_gain < 1.0);
    }

    #[test]
    fn test_makeup_gain() {
        let mut comp = Compressor::new();
        comp.set_makeup_gain_db(6.0);
        comp.set_enabled(true);
        let out = settle(&mut comp, 0.1);
        assert_relative_eq!(out, 0.1 * db_to_linear(6.0), epsilon = 1e-5);
    }
}
