//! Background rewrite worker
//!
//! One thread owns the rewriter and serves requests in submission order.
//! Finished jobs are queued for the control thread, which drains them when
//! it is ready; the worker never touches engine state.

use super::{rewrite_or_fallback, RewriteOutcome, TextRewriter};
use crate::error::{Result, SonaraError};
use crossbeam::channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// A finished rewrite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteJob {
    pub id: u64,
    pub original: String,
    pub outcome: RewriteOutcome,
}

/// Handle to the worker thread; dropping it stops the thread
pub struct RewriteWorker {
    requests: Option<Sender<(u64, String)>>,
    results: Receiver<RewriteJob>,
    handle: Option<JoinHandle<()>>,
    next_id: u64,
}

impl std::fmt::Debug for RewriteWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewriteWorker")
            .field("next_id", &self.next_id)
            .field("pending_results", &self.results.len())
            .finish()
    }
}

impl RewriteWorker {
    /// Start the worker thread
    pub fn spawn(rewriter: Arc<dyn TextRewriter>) -> Result<Self> {
        let (request_tx, request_rx) = unbounded::<(u64, String)>();
        let (result_tx, result_rx) = unbounded::<RewriteJob>();

        let handle = std::thread::Builder::new()
            .name("sonara-rewrite".to_string())
            .spawn(move || {
                for (id, original) in request_rx.iter() {
                    debug!(id, rewriter = rewriter.name(), "rewriting");
                    let outcome = rewrite_or_fallback(rewriter.as_ref(), &original);
                    if result_tx.send(RewriteJob { id, original, outcome }).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            handle: Some(handle),
            next_id: 0,
        })
    }

    /// Queue a request; returns its job id
    pub fn submit(&mut self, text: impl Into<String>) -> Result<u64> {
        let id = self.next_id;
        let requests = self.requests.as_ref().ok_or(SonaraError::WorkerDisconnected)?;
        requests
            .send((id, text.into()))
            .map_err(|_| SonaraError::WorkerDisconnected)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Next finished job, if any, without blocking
    pub fn try_next(&self) -> Result<Option<RewriteJob>> {
        match self.results.try_recv() {
            Ok(job) => Ok(Some(job)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SonaraError::WorkerDisconnected),
        }
    }
}

impl Drop for RewriteWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
