//! DSP Stages
//!
//! The three processors driven by the mapper. All of them implement the
//! [`Stage`] trait and run in place on an [`AudioBuffer`].

mod chain;
mod compressor;
mod eq;
mod reverb;
mod stage;

pub use crate::engine::AudioBuffer;
pub use chain::EffectChain;
pub use compressor::{time_coefficient, Compressor, ENVELOPE_FLOOR};
pub use eq::{BandKind, BiquadCoeffs, Equalizer, SHELF_Q};
pub use reverb::Reverb;
pub use stage::{ProcessSpec, Stage};
