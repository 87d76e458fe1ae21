//! Audio Engine Module
//!
//! Runtime side of the effect engine:
//! - Audio buffer management
//! - Lock-free parameter hand-off to the audio thread
//! - The orchestrator tying commands, rewriter and chain together

pub mod buffer;
pub mod orchestrator;
pub mod realtime;

pub use buffer::{calculate_peak, calculate_rms, db_to_linear, linear_to_db, AudioBuffer};
pub use orchestrator::{
    AudioProcessor, CompletionCallback, Controller, Orchestrator, INTENSITY_RANGE,
};
pub use realtime::{parameter_channel, ParameterPublisher, ParameterReader, ParameterSnapshot};
