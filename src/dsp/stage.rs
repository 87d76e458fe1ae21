//! Stage trait definition
//!
//! Common capability interface for every processor in the effect chain.

use crate::engine::AudioBuffer;
use crate::mapper::AudioParameters;
use std::any::Any;

/// Playback configuration a stage is prepared for
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Largest block the host will deliver
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl Default for ProcessSpec {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            max_block_size: 512,
            num_channels: 2,
        }
    }
}

impl ProcessSpec {
    pub fn new(sample_rate: f64, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }
}

/// Base trait for all effect stages
///
/// Stages process audio buffers in place. `process` runs on the audio
/// thread and must not allocate, block or fail.
pub trait Stage: Send {
    /// Prepare for playback
    ///
    /// Repeating a call with an identical spec must leave filter memory
    /// untouched.
    fn prepare(&mut self, spec: ProcessSpec);

    /// Change the sample rate, recomputing coefficients
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Clear internal state (filter history, envelopes, delay lines)
    fn reset(&mut self);

    /// Process a buffer in place
    fn process(&mut self, buffer: &mut AudioBuffer);

    /// Push every field this stage owns from a parameter set
    fn apply(&mut self, params: &AudioParameters);

    /// Stable identifier ("eq", "compressor", "reverb")
    fn stage_type(&self) -> &'static str;

    /// Human-readable name
    fn display_name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Downcast support for metering and tests
    fn as_any(&self) -> &dyn Any;
}

/// Implements the identity methods of [`Stage`]
#[macro_export]
macro_rules! impl_stage_common {
    ($stage_type:expr, $display_name:expr) => {
        fn stage_type(&self) -> &'static str {
            $stage_type
        }

        fn display_name(&self) -> &str {
            $display_name
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };
}
