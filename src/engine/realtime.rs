//! Control → audio parameter hand-off
//!
//! The control thread publishes immutable snapshots through an `ArcSwap`;
//! the audio thread loads the latest one at the start of each block without
//! locking. Each publish bumps a generation counter so the reader only
//! re-applies parameters when something actually changed.

use crate::mapper::AudioParameters;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// One published parameter set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    /// Increases by one per publish, starting at 0 for the initial set
    pub generation: u64,
    pub params: AudioParameters,
}

/// Single writer side, owned by the control thread
#[derive(Debug)]
pub struct ParameterPublisher {
    shared: Arc<ArcSwap<ParameterSnapshot>>,
    generation: u64,
}

/// Reader side, owned by the audio thread
#[derive(Debug)]
pub struct ParameterReader {
    shared: Arc<ArcSwap<ParameterSnapshot>>,
    /// Generation last handed out by `poll`; None before the first poll
    applied: Option<u64>,
}

/// Create a connected publisher/reader pair holding `initial`
pub fn parameter_channel(initial: AudioParameters) -> (ParameterPublisher, ParameterReader) {
    let shared = Arc::new(ArcSwap::from_pointee(ParameterSnapshot {
        generation: 0,
        params: initial,
    }));

    (
        ParameterPublisher {
            shared: Arc::clone(&shared),
            generation: 0,
        },
        ParameterReader {
            shared,
            applied: None,
        },
    )
}

impl ParameterPublisher {
    /// Publish a new parameter set; returns its generation
    pub fn publish(&mut self, params: AudioParameters) -> u64 {
        self.generation += 1;
        self.shared.store(Arc::new(ParameterSnapshot {
            generation: self.generation,
            params,
        }));
        self.generation
    }

    /// Most recently published parameters
    pub fn current(&self) -> AudioParameters {
        self.shared.load().params
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl ParameterReader {
    /// Latest snapshot if it has not been returned before
    ///
    /// Lock-free; the snapshot is copied out so no reference outlives the call.
    pub fn poll(&mut self) -> Option<ParameterSnapshot> {
        let snapshot = **self.shared.load();
        if self.applied == Some(snapshot.generation) {
            return None;
        }
        self.applied = Some(snapshot.generation);
        Some(snapshot)
    }

    /// Latest snapshot regardless of what was applied
    pub fn latest(&self) -> ParameterSnapshot {
        **self.shared.load()
    }

}
