//! Effect Chain management
//!
//! Stages are processed in chain order (index 0 first). The default order is
//! Equalizer → Compressor → Reverb, so the compressor reacts to the
//! equalized signal and the reverb tail is not compressed.

use super::{AudioBuffer, Compressor, Equalizer, ProcessSpec, Reverb, Stage};
use crate::mapper::AudioParameters;

/// Ordered chain of stages
pub struct EffectChain {
    stages: Vec<Box<dyn Stage>>,
    spec: ProcessSpec,
}

impl std::fmt::Debug for EffectChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectChain")
            .field("stages", &self.stage_types())
            .field("spec", &self.spec)
            .finish()
    }
}

impl Default for EffectChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl EffectChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            spec: ProcessSpec::default(),
        }
    }

    /// Equalizer → Compressor → Reverb
    pub fn standard() -> Self {
        Self::with_stages(vec![
            Box::new(Equalizer::new()),
            Box::new(Compressor::new()),
            Box::new(Reverb::new()),
        ])
    }

    /// Create a chain with stages in the given order
    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        let mut chain = Self::new();
        for stage in stages {
            chain.push(stage);
        }
        chain
    }

    /// Append a stage, preparing it for the chain's current spec
    pub fn push(&mut self, mut stage: Box<dyn Stage>) {
        stage.prepare(self.spec);
        self.stages.push(stage);
    }

    /// Prepare all stages for processing
    pub fn prepare(&mut self, spec: ProcessSpec) {
        self.spec = spec;
        for stage in &mut self.stages {
            stage.prepare(spec);
        }
    }

    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.spec.sample_rate = sample_rate;
        for stage in &mut self.stages {
            stage.set_sample_rate(sample_rate);
        }
    }

    /// Reset all stages
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Run the buffer through every stage in order
    pub fn process(&mut self, buffer: &mut AudioBuffer) {
        for stage in &mut self.stages {
            stage.process(buffer);
        }
    }

    /// Push a parameter set into every stage
    pub fn apply(&mut self, params: &AudioParameters) {
        for stage in &mut self.stages {
            stage.apply(params);
        }
    }

    pub fn spec(&self) -> ProcessSpec {
        self.spec
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Stage> {
        self.stages.iter().map(|s| s.as_ref())
    }

    /// Stage identifiers in processing order
    pub fn stage_types(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.stage_type()).collect()
    }

    /// First stage of a concrete type
    pub fn find<T: Stage + 'static>(&self) -> Option<&T> {
        self.stages
            .iter()
            .find_map(|s| s.as_any().downcast_ref::<T>())
    }
}
