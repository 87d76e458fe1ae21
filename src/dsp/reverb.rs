//! Reverb stage
//!
//! Freeverb topology:
//! - 8 parallel damped comb filters per channel
//! - 4 series allpass filters per channel for diffusion
//! - Right channel delays offset by a fixed stereo spread
//!
//! Delay lengths are tuned for 44.1 kHz and scaled to the prepared rate.

use super::{AudioBuffer, ProcessSpec, Stage};
use crate::impl_stage_common;
use crate::mapper::AudioParameters;

// ============================================================================
// Freeverb Constants
// ============================================================================

/// Sample rate the delay tables are tuned for
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb filter delays at 44100 Hz
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delays at 44100 Hz
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Right channel offset in samples
const STEREO_SPREAD: usize = 23;

const ALLPASS_FEEDBACK: f32 = 0.5;

/// Feedback = room_size * ROOM_SCALE + ROOM_OFFSET
const ROOM_SCALE: f32 = 0.28;
const ROOM_OFFSET: f32 = 0.7;

const DAMP_SCALE: f32 = 0.4;

/// Input attenuation ahead of the comb bank
const FIXED_GAIN: f32 = 0.015;

/// Wet output scaling
const WET_SCALE: f32 = 3.0;

// ============================================================================
// Filter Components
// ============================================================================

/// Low-pass feedback comb filter
#[derive(Debug, Clone)]
struct CombFilter {
    buffer: Vec<f32>,
    index: usize,
    /// One-pole low-pass state in the feedback path
    filter_store: f32,
}

impl CombFilter {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            index: 0,
            filter_store: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.index];
        self.filter_store = output * (1.0 - damp) + self.filter_store * damp;
        self.buffer[self.index] = input + self.filter_store * feedback;

        self.index += 1;
        if self.index == self.buffer.len() {
            self.index = 0;
        }
        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.filter_store = 0.0;
    }
}

/// Schroeder allpass diffuser
#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    index: usize,
}

impl AllpassFilter {
    fn new(delay: usize) -> Self {
        Self {
            buffer: vec![0.0; delay.max(1)],
            index: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input + delayed * ALLPASS_FEEDBACK;

        self.index += 1;
        if self.index == self.buffer.len() {
            self.index = 0;
        }
        delayed - input
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
    }
}

/// Comb bank plus allpass chain for one output channel
#[derive(Debug, Clone)]
struct Network {
    combs: [CombFilter; 8],
    allpasses: [AllpassFilter; 4],
}

impl Network {
    fn new(sample_rate: f64, spread: usize) -> Self {
        let scale = |delay: usize| ((delay + spread) as f64 * sample_rate / REFERENCE_SAMPLE_RATE) as usize;
        Self {
            combs: std::array::from_fn(|i| CombFilter::new(scale(COMB_DELAYS[i]))),
            allpasses: std::array::from_fn(|i| AllpassFilter::new(scale(ALLPASS_DELAYS[i]))),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input, feedback, damp);
        }
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }

    fn is_silent(&self) -> bool {
        self.combs
            .iter()
            .all(|c| c.filter_store == 0.0 && c.buffer.iter().all(|s| *s == 0.0))
            && self
                .allpasses
                .iter()
                .all(|a| a.buffer.iter().all(|s| *s == 0.0))
    }
}

// ============================================================================
// Reverb Stage
// ============================================================================

/// Freeverb-style reverb stage
///
/// All five mix parameters are normalized to [0, 1]; setters clamp.
#[derive(Debug, Clone)]
pub struct Reverb {
    enabled: bool,
    room_size: f32,
    damping: f32,
    width: f32,
    wet_level: f32,
    dry_level: f32,

    // Derived
    feedback: f32,
    damp: f32,
    wet1: f32,
    wet2: f32,

    left: Network,
    right: Network,
    spec: Option<ProcessSpec>,
    sample_rate: f64,
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new()
    }
}

impl Reverb {
    /// Create a disabled reverb with a dry-only mix
    pub fn new() -> Self {
        let sample_rate = ProcessSpec::default().sample_rate;
        let mut reverb = Self {
            enabled: false,
            room_size: 0.0,
            damping: 0.0,
            width: 1.0,
            wet_level: 0.0,
            dry_level: 1.0,
            feedback: 0.0,
            damp: 0.0,
            wet1: 0.0,
            wet2: 0.0,
            left: Network::new(sample_rate, 0),
            right: Network::new(sample_rate, STEREO_SPREAD),
            spec: None,
            sample_rate,
        };
        reverb.update_coefficients();
        reverb
    }

    pub fn set_room_size(&mut self, room_size: f32) {
        self.room_size = normalized(room_size);
        self.update_coefficients();
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = normalized(damping);
        self.update_coefficients();
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = normalized(width);
        self.update_coefficients();
    }

    pub fn set_wet_level(&mut self, wet_level: f32) {
        self.wet_level = normalized(wet_level);
        self.update_coefficients();
    }

    pub fn set_dry_level(&mut self, dry_level: f32) {
        self.dry_level = normalized(dry_level);
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn room_size(&self) -> f32 {
        self.room_size
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn wet_level(&self) -> f32 {
        self.wet_level
    }

    pub fn dry_level(&self) -> f32 {
        self.dry_level
    }

    /// True when every delay line is empty
    pub fn is_silent(&self) -> bool {
        self.left.is_silent() && self.right.is_silent()
    }

    fn update_coefficients(&mut self) {
        self.feedback = self.room_size * ROOM_SCALE + ROOM_OFFSET;
        self.damp = self.damping * DAMP_SCALE;

        let wet = self.wet_level * WET_SCALE;
        self.wet1 = wet * (1.0 + self.width) / 2.0;
        self.wet2 = wet * (1.0 - self.width) / 2.0;
    }

    fn rebuild(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.left = Network::new(sample_rate, 0);
        self.right = Network::new(sample_rate, STEREO_SPREAD);
    }

    fn process_mono(&mut self, buffer: &mut AudioBuffer) {
        let (feedback, damp) = (self.feedback, self.damp);
        for sample in buffer.channel_mut(0).iter_mut() {
            let input = *sample;
            let wet = self.left.process(input * FIXED_GAIN, feedback, damp);
            *sample = wet * self.wet1 + input * self.dry_level;
        }
    }

    fn process_stereo(&mut self, buffer: &mut AudioBuffer) {
        let (feedback, damp) = (self.feedback, self.damp);
        for frame in 0..buffer.num_samples() {
            let in_left = buffer.channel(0)[frame];
            let in_right = buffer.channel(1)[frame];
            let input = (in_left + in_right) * FIXED_GAIN;

            let out_left = self.left.process(input, feedback, damp);
            let out_right = self.right.process(input, feedback, damp);

            buffer.channel_mut(0)[frame] =
                out_left * self.wet1 + out_right * self.wet2 + in_left * self.dry_level;
            buffer.channel_mut(1)[frame] =
                out_right * self.wet1 + out_left * self.wet2 + in_right * self.dry_level;
        }
    }
}

/// Clamp to [0, 1], mapping NaN to 0
fn normalized(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

impl Stage for Reverb {
    /// Delay lines are rebuilt only on a sample-rate change; parameters and
    /// the enabled flag always survive.
    fn prepare(&mut self, spec: ProcessSpec) {
        if self.spec == Some(spec) {
            return;
        }
        if spec.sample_rate != self.sample_rate {
            self.rebuild(spec.sample_rate);
        }
        self.spec = Some(spec);
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate != self.sample_rate {
            self.rebuild(sample_rate);
        }
        if let Some(spec) = self.spec.as_mut() {
            spec.sample_rate = sample_rate;
        }
    }

    fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.enabled || buffer.is_empty() {
            return;
        }

        match buffer.num_channels() {
            0 => {}
            1 => self.process_mono(buffer),
            _ => self.process_stereo(buffer),
        }
    }

    fn apply(&mut self, params: &AudioParameters) {
        let reverb = &params.reverb;
        self.set_room_size(reverb.room_size);
        self.set_damping(reverb.damping);
        self.set_width(reverb.width);
        self.set_wet_level(reverb.wet_level);
        self.set_dry_level(reverb.dry_level);
        self.set_enabled(reverb.enabled);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    impl_stage_common!("reverb", "Reverb");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hall() -> Reverb {
        let mut reverb = Reverb::new();
        reverb.prepare(ProcessSpec::new(44100.0, 512, 2));
        reverb.set_room_size(0.8);
        reverb.set_damping(0.5);
        reverb.set_wet_level(0.25);
        reverb.set_width(1.0);
        reverb.set_enabled(true);
        reverb
    }

    fn impulse(channels: usize, len: usize) -> AudioBuffer {
        let mut buffer = AudioBuffer::new(channels, len, 44100.0);
        for ch in 0..channels {
            buffer.set(0, ch, 1.0);
        }
        buffer
    }

    fn energy(samples: &[f32]) -> f32 {
        samples.iter().map(|s| s * s).sum()
    }

    #[test]
    fn test_disabled_is_bypass() {
        let mut reverb = hall();
        reverb.set_enabled(false);
        let mut buffer = AudioBuffer::sine(440.0, 0.5, 2, 512, 44100.0);
        let original = buffer.clone();

        reverb.process(&mut buffer);

        assert_eq!(buffer, original);
        assert!(reverb.is_silent());
    }

    #[test]
    fn test_impulse_produces_tail() {
        let mut reverb = hall();
        reverb.set_dry_level(0.0);
        let mut buffer = impulse(2, 8192);

        reverb.process(&mut buffer);

        // Nothing arrives before the shortest comb delay
        assert_eq!(buffer.channel(0)[100], 0.0);
        assert!(energy(&buffer.channel(0)[2000..]) > 0.0);
        assert!(energy(&buffer.channel(1)[2000..]) > 0.0);
        assert!(buffer.is_finite());
    }

    #[test]
    fn test_room_size_lengthens_decay() {
        let tail = |room: f32| {
            let mut reverb = hall();
            reverb.set_room_size(room);
            reverb.set_dry_level(0.0);
            let mut buffer = impulse(1, 44100);
            reverb.process(&mut buffer);
            energy(&buffer.channel(0)[22050..])
        };

        assert!(tail(0.9) > tail(0.1));
    }

    #[test]
    fn test_zero_width_is_mono() {
        let mut reverb = hall();
        reverb.set_width(0.0);
        let mut buffer = impulse(2, 4096);

        reverb.process(&mut buffer);

        assert_eq!(buffer.channel(0), buffer.channel(1));
    }

    #[test]
    fn test_reset_clears_tail() {
        let mut reverb = hall();
        let mut buffer = impulse(2, 2048);
        reverb.process(&mut buffer);
        assert!(!reverb.is_silent());

        reverb.reset();
        assert!(reverb.is_silent());

        let mut silence = AudioBuffer::new(2, 4096, 44100.0);
        reverb.process(&mut silence);
        assert_eq!(silence.peak(), 0.0);
    }

    #[test]
    fn test_prepare_preserves_state_and_parameters() {
        let mut reverb = hall();
        let mut buffer = impulse(2, 512);
        reverb.process(&mut buffer);

        reverb.prepare(ProcessSpec::new(44100.0, 512, 2));
        assert!(!reverb.is_silent());

        reverb.prepare(ProcessSpec::new(48000.0, 256, 2));
        assert!(reverb.is_silent());
        assert_eq!(reverb.room_size(), 0.8);
        assert_eq!(reverb.wet_level(), 0.25);
        assert!(reverb.is_enabled());
    }

    #[test]
    fn test_prepare_after_rate_change_rebuilds() {
        let mut reverb = hall();
        reverb.set_sample_rate(96000.0);
        assert!(reverb.left.combs[0].buffer.len() > COMB_DELAYS[0] * 2);

        reverb.prepare(ProcessSpec::new(44100.0, 512, 2));

        let expected = Network::new(44100.0, 0);
        assert_eq!(reverb.sample_rate, 44100.0);
        assert_eq!(reverb.left.combs[0].buffer.len(), expected.combs[0].buffer.len());
        assert_eq!(reverb.room_size(), 0.8);
    }

    #[test]
    fn test_setters_clamp() {
        let mut reverb = Reverb::new();
        reverb.set_room_size(1.5);
        reverb.set_damping(-0.2);
        reverb.set_wet_level(f32::NAN);
        assert_eq!(reverb.room_size(), 1.0);
        assert_eq!(reverb.damping(), 0.0);
        assert_eq!(reverb.wet_level(), 0.0);
    }

    #[test]
    fn test_apply_removal_disables() {
        let mut reverb = hall();
        let params = AudioParameters::default();
        reverb.apply(&params);
        assert!(!reverb.is_enabled());
        assert_eq!(reverb.wet_level(), 0.0);
        assert_eq!(reverb.dry_level(), 1.0);
    }
}
