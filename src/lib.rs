//! Sonara - Text-Driven Audio Effects
//!
//! Sonara turns plain-language requests ("make it warmer", "add punchy
//! compression") into settings for a fixed effect chain and runs that chain
//! on audio blocks in real time.
//!
//! # Architecture
//!
//! - [`mapper`]: rule tables mapping a command to parameters and a change log
//! - [`dsp`]: the EQ, compressor and reverb stages and the chain running them
//! - [`engine`]: buffers, lock-free parameter hand-off and the orchestrator
//! - [`rewrite`]: optional LLM pre-processing with fallback to the raw text
//!
//! # Example
//! ```
//! use sonara::engine::{AudioBuffer, Orchestrator};
//!
//! let mut engine = Orchestrator::new();
//! engine.prepare_to_play(48000.0, 256, 2);
//! engine.process_text_input("very bright and spacious");
//!
//! let mut block = AudioBuffer::sine(1000.0, 0.25, 2, 256, 48000.0);
//! engine.process_block(&mut block);
//! assert!(block.is_finite());
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod rewrite;

pub use config::SonaraConfig;
pub use engine::Orchestrator;
pub use error::{Result, SonaraError};
pub use mapper::{AudioParameters, KeywordMapper};
