//! Audio Buffer Management
//!
//! The block type handed to every stage. Samples are stored planar
//! (one `Vec<f32>` per channel) and processed in place.

use crate::error::{Result, SonaraError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Calculate the RMS level of a single channel in dB
///
/// Returns -f32::INFINITY for empty or silent channels.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    let rms = (sum_squares / samples.len() as f64).sqrt() as f32;
    linear_to_db(rms)
}

/// Calculate the peak absolute sample value of a single channel (linear)
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|&s| s.abs()).fold(0.0_f32, f32::max)
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// One block of non-interleaved 32-bit float audio
///
/// # Example
/// ```
/// use sonara::engine::AudioBuffer;
///
/// let buffer = AudioBuffer::new(2, 512, 44100.0);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.num_samples(), 512);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data: outer Vec is channels, inner Vec is samples
    samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: f64,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_channels: usize, num_samples: usize, sample_rate: f64) -> Self {
        Self {
            samples: vec![vec![0.0_f32; num_samples]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel sample vectors
    ///
    /// All channels must have the same length.
    pub fn from_channels(samples: Vec<Vec<f32>>, sample_rate: f64) -> Result<Self> {
        if let Some(first) = samples.first() {
            let len = first.len();
            if let Some(bad) = samples.iter().position(|ch| ch.len() != len) {
                return Err(SonaraError::InvalidParameter {
                    param: format!("channel {}", bad),
                    value: samples[bad].len().to_string(),
                    expected: format!("{} samples", len),
                });
            }
        }

        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a buffer holding the same sine tone on every channel
    pub fn sine(
        frequency: f64,
        amplitude: f32,
        num_channels: usize,
        num_samples: usize,
        sample_rate: f64,
    ) -> Self {
        let tone: Vec<f32> = (0..num_samples)
            .map(|i| {
                let t = i as f64 / sample_rate;
                amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
            })
            .collect();

        Self {
            samples: vec![tone; num_channels],
            sample_rate,
        }
    }

    /// Get the number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.samples.len()
    }

    /// Get the number of samples per channel
    #[inline]
    pub fn num_samples(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }

    /// Get the sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Get immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// Get mutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.samples[index]
    }

    /// Iterate mutably over all channels
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.samples.iter_mut().map(|ch| ch.as_mut_slice())
    }

    /// Get a sample, or None if out of bounds
    #[inline]
    pub fn get(&self, frame: usize, channel: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(frame).copied())
    }

    /// Set a sample; out-of-bounds writes are ignored
    #[inline]
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        if let Some(sample) = self
            .samples
            .get_mut(channel)
            .and_then(|ch| ch.get_mut(frame))
        {
            *sample = value;
        }
    }

    /// Zero every sample
    pub fn clear(&mut self) {
        for channel in &mut self.samples {
            channel.fill(0.0);
        }
    }

    /// Peak absolute value across all channels (linear)
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .map(|ch| calculate_peak(ch))
            .fold(0.0_f32, f32::max)
    }

    /// RMS level of one channel in dB
    pub fn rms_db(&self, channel: usize) -> f32 {
        self.samples
            .get(channel)
            .map(|ch| calculate_rms(ch))
            .unwrap_or(f32::NEG_INFINITY)
    }

    /// True when every sample is finite
    pub fn is_finite(&self) -> bool {
        self.samples.iter().flatten().all(|s| s.is_finite())
    }
}
