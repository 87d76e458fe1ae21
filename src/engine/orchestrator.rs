//! Effect chain orchestration
//!
//! The engine is split along its two threads:
//! - [`Controller`] runs on the control/UI thread. It maps commands, keeps
//!   the change log, talks to the rewriter and publishes parameters.
//! - [`AudioProcessor`] runs on the audio thread. It picks up the latest
//!   parameters at the start of a block and runs the chain in place.
//!
//! [`Orchestrator`] bundles both for hosts that drive everything from one
//! place; [`Orchestrator::into_parts`] splits it for hosts that don't.

use super::buffer::AudioBuffer;
use super::realtime::{parameter_channel, ParameterPublisher, ParameterReader};
use crate::config::SonaraConfig;
use crate::dsp::{EffectChain, ProcessSpec};
use crate::error::Result;
use crate::mapper::{AudioParameters, ChangeEntry, ChangeLog, ChangeTag, KeywordMapper};
use crate::rewrite::{rewrite_or_fallback, GeminiRewriter, RewriteOutcome, RewriteWorker, TextRewriter};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lowest and highest intensity a host may set
pub const INTENSITY_RANGE: (f32, f32) = (0.0, 2.0);

/// Called on the control thread with the change snapshot of a finished
/// asynchronous command
pub type CompletionCallback = Box<dyn FnOnce(&[ChangeEntry]) + Send>;

// ============================================================================
// Control side
// ============================================================================

/// Control-thread half of the engine
pub struct Controller {
    mapper: KeywordMapper,
    publisher: ParameterPublisher,
    change_log: ChangeLog,
    intensity: f32,
    rewriter: Option<Arc<dyn TextRewriter>>,
    worker: Option<RewriteWorker>,
    /// Async commands waiting for their rewrite, keyed by job id
    pending: BTreeMap<u64, (String, CompletionCallback)>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("intensity", &self.intensity)
            .field("generation", &self.publisher.generation())
            .field("rewriter", &self.rewriter.as_ref().map(|r| r.name().to_string()))
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Controller {
    /// Set the base intensity, clamped to 0.0..=2.0; NaN is ignored
    pub fn set_intensity(&mut self, intensity: f32) {
        if intensity.is_nan() {
            warn!("ignoring NaN intensity");
            return;
        }
        self.intensity = intensity.clamp(INTENSITY_RANGE.0, INTENSITY_RANGE.1);
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Replace the rewriter
    ///
    /// Finished rewrites from the old worker are applied first. Commands it
    /// has not answered yet are mapped from their original text.
    pub fn set_rewriter(&mut self, rewriter: Arc<dyn TextRewriter>) {
        self.dispatch_pending();
        self.flush_pending("rewriter replaced before answering");
        self.worker = None;
        self.rewriter = Some(rewriter);
    }

    pub fn has_rewriter(&self) -> bool {
        self.rewriter.is_some()
    }

    /// Map a command and publish its parameters
    ///
    /// Returns the change snapshot for this command.
    pub fn process_text_input(&mut self, text: &str) -> Vec<ChangeEntry> {
        self.change_log.clear();
        self.map_and_publish(text)
    }

    /// Rewrite a command (blocking), then map it
    ///
    /// Falls back to the original text when the rewriter is missing or fails.
    pub fn process_text_input_rewritten(&mut self, text: &str) -> Vec<ChangeEntry> {
        let outcome = match &self.rewriter {
            Some(rewriter) => rewrite_or_fallback(rewriter.as_ref(), text),
            None => RewriteOutcome::fallback(text, "no rewriter configured"),
        };
        self.apply_rewrite(text, outcome)
    }

    /// Rewrite a command on the worker thread
    ///
    /// The result is applied, and `on_complete` called, by the next
    /// [`dispatch_pending`](Self::dispatch_pending) after the worker is done.
    /// Without a rewriter the command is mapped right away and `on_complete`
    /// runs before this returns.
    pub fn process_text_input_async(&mut self, text: &str, on_complete: CompletionCallback) {
        let Some(rewriter) = self.rewriter.clone() else {
            let changes = self.apply_rewrite(text, RewriteOutcome::fallback(text, "no rewriter configured"));
            on_complete(&changes);
            return;
        };

        match self.submit(rewriter, text) {
            Ok(id) => {
                debug!(id, "queued rewrite");
                self.pending.insert(id, (text.to_string(), on_complete));
            }
            Err(e) => {
                let changes = self.apply_rewrite(text, RewriteOutcome::fallback(text, e.to_string()));
                on_complete(&changes);
            }
        }
    }

    fn submit(&mut self, rewriter: Arc<dyn TextRewriter>, text: &str) -> Result<u64> {
        if self.worker.is_none() {
            self.worker = Some(RewriteWorker::spawn(rewriter)?);
        }
        match self.worker.as_mut() {
            Some(worker) => worker.submit(text),
            None => Err(crate::error::SonaraError::WorkerDisconnected),
        }
    }

    /// Apply every finished asynchronous rewrite; returns how many ran
    ///
    /// Must be called from the control thread.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut dispatched = 0;
        loop {
            let next = match &self.worker {
                Some(worker) => worker.try_next(),
                None => Ok(None),
            };

            match next {
                Ok(Some(job)) => {
                    let Some((original, on_complete)) = self.pending.remove(&job.id) else {
                        warn!(id = job.id, "dropping rewrite with no pending command");
                        continue;
                    };
                    let changes = self.apply_rewrite(&original, job.outcome);
                    on_complete(&changes);
                    dispatched += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "rewrite worker stopped; mapping queued commands directly");
                    self.worker = None;
                    dispatched += self.flush_pending(&e.to_string());
                    break;
                }
            }
        }
        dispatched
    }

    /// Map every queued command from its original text, in submission order
    fn flush_pending(&mut self, reason: &str) -> usize {
        let queued = std::mem::take(&mut self.pending);
        let count = queued.len();
        for (_, (original, on_complete)) in queued {
            let changes = self.apply_rewrite(&original, RewriteOutcome::fallback(&original, reason));
            on_complete(&changes);
        }
        count
    }

    /// Number of asynchronous commands still waiting for the worker
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Snapshot of the bounded change history, oldest first
    pub fn change_log(&self) -> Vec<ChangeEntry> {
        self.change_log.snapshot()
    }

    /// Parameters most recently published to the audio side
    pub fn current_parameters(&self) -> AudioParameters {
        self.publisher.current()
    }

    /// Publish a parameter set directly, bypassing the mapper
    pub fn publish(&mut self, params: AudioParameters) -> u64 {
        self.publisher.publish(params)
    }

    fn apply_rewrite(&mut self, original: &str, outcome: RewriteOutcome) -> Vec<ChangeEntry> {
        self.change_log.clear();
        if outcome.success {
            info!(original, rewritten = %outcome.text, "rewriter applied");
        } else {
            let reason = outcome.error.as_deref().unwrap_or("unknown error");
            warn!(original, reason, "rewriter fell back to original text");
            self.change_log.push(ChangeEntry::new(
                format!("Rewriter unavailable ({}); using original text", reason),
                ChangeTag::System,
            ));
        }
        self.map_and_publish(&outcome.text)
    }

    fn map_and_publish(&mut self, text: &str) -> Vec<ChangeEntry> {
        let mapping = self.mapper.map(text, self.intensity);
        let generation = self.publisher.publish(mapping.params);
        self.change_log.extend(mapping.changes);

        info!(
            text,
            generation,
            intensity = mapping.params.intensity,
            changes = self.change_log.len(),
            "applied command"
        );
        self.change_log.snapshot()
    }
}

// ============================================================================
// Audio side
// ============================================================================

/// Audio-thread half of the engine
#[derive(Debug)]
pub struct AudioProcessor {
    chain: EffectChain,
    reader: ParameterReader,
    applied_generation: Option<u64>,
}

impl AudioProcessor {
    pub fn prepare(&mut self, spec: ProcessSpec) {
        self.chain.prepare(spec);
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.chain.set_sample_rate(sample_rate);
    }

    /// Clear all stage memory, keeping the current parameters
    pub fn reset(&mut self) {
        self.chain.reset();
        let snapshot = self.reader.latest();
        self.chain.apply(&snapshot.params);
        self.applied_generation = Some(snapshot.generation);
    }

    /// Process one block in place
    ///
    /// Picks up newly published parameters first. Never blocks or allocates.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer) {
        if let Some(snapshot) = self.reader.poll() {
            self.chain.apply(&snapshot.params);
            self.applied_generation = Some(snapshot.generation);
        }
        self.chain.process(buffer);
    }

    pub fn chain(&self) -> &EffectChain {
        &self.chain
    }

    /// Generation of the parameters the stages currently hold
    pub fn applied_generation(&self) -> Option<u64> {
        self.applied_generation
    }
}

// ============================================================================
// Combined engine
// ============================================================================

/// Text-driven effect engine
///
/// # Example
/// ```
/// use sonara::engine::{AudioBuffer, Orchestrator};
///
/// let mut engine = Orchestrator::new();
/// engine.prepare_to_play(44100.0, 512, 2);
///
/// let changes = engine.process_text_input("make it warmer");
/// assert_eq!(changes.len(), 2);
///
/// let mut block = AudioBuffer::sine(440.0, 0.5, 2, 512, 44100.0);
/// engine.process_block(&mut block);
/// ```
#[derive(Debug)]
pub struct Orchestrator {
    controller: Controller,
    processor: AudioProcessor,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Engine with default settings and no rewriter
    pub fn new() -> Self {
        Self::with_config(&SonaraConfig::default())
    }

    /// Engine built from a configuration
    ///
    /// A Gemini rewriter is attached when an API key is configured.
    pub fn with_config(config: &SonaraConfig) -> Self {
        let (publisher, reader) = parameter_channel(AudioParameters::default());

        let rewriter: Option<Arc<dyn TextRewriter>> = if config.gemini.is_configured() {
            Some(Arc::new(GeminiRewriter::new(config.gemini.clone())))
        } else {
            None
        };

        let mut controller = Controller {
            mapper: KeywordMapper::new(),
            publisher,
            change_log: ChangeLog::with_capacity(config.change_log_capacity),
            intensity: 1.0,
            rewriter,
            worker: None,
            pending: BTreeMap::new(),
        };
        controller.set_intensity(config.default_intensity);

        let mut processor = AudioProcessor {
            chain: EffectChain::standard(),
            reader,
            applied_generation: None,
        };
        processor.prepare(ProcessSpec::new(config.sample_rate, config.block_size, config.channels));

        Self { controller, processor }
    }

    /// Replace the rewriter
    pub fn with_rewriter(mut self, rewriter: Arc<dyn TextRewriter>) -> Self {
        self.controller.set_rewriter(rewriter);
        self
    }

    /// Split into the control-thread and audio-thread halves
    pub fn into_parts(self) -> (Controller, AudioProcessor) {
        (self.controller, self.processor)
    }

    pub fn controller(&mut self) -> &mut Controller {
        &mut self.controller
    }

    pub fn processor(&self) -> &AudioProcessor {
        &self.processor
    }

    // ---- host interface ----

    pub fn prepare_to_play(&mut self, sample_rate: f64, block_size: usize, channels: usize) {
        self.processor.prepare(ProcessSpec::new(sample_rate, block_size, channels));
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.processor.set_sample_rate(sample_rate);
    }

    pub fn reset(&mut self) {
        self.processor.reset();
    }

    pub fn process_block(&mut self, buffer: &mut AudioBuffer) {
        self.processor.process_block(buffer);
    }

    // ---- text interface ----

    pub fn set_intensity(&mut self, intensity: f32) {
        self.controller.set_intensity(intensity);
    }

    pub fn intensity(&self) -> f32 {
        self.controller.intensity()
    }

    pub fn process_text_input(&mut self, text: &str) -> Vec<ChangeEntry> {
        self.controller.process_text_input(text)
    }

    pub fn process_text_input_rewritten(&mut self, text: &str) -> Vec<ChangeEntry> {
        self.controller.process_text_input_rewritten(text)
    }

    pub fn process_text_input_async(&mut self, text: &str, on_complete: CompletionCallback) {
        self.controller.process_text_input_async(text, on_complete);
    }

    pub fn dispatch_pending(&mut self) -> usize {
        self.controller.dispatch_pending()
    }

    pub fn change_log(&self) -> Vec<ChangeEntry> {
        self.controller.change_log()
    }

    pub fn current_parameters(&self) -> AudioParameters {
        self.controller.current_parameters()
    }
}
