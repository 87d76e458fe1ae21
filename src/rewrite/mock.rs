//! Scripted rewriter for tests and offline runs

use super::TextRewriter;
use crate::error::{Result, SonaraError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
enum Script {
    Reply(String),
    Fail(Mutex<Option<SonaraError>>),
    Echo,
}

/// Rewriter with a fixed behavior that counts its calls
#[derive(Debug)]
pub struct MockRewriter {
    script: Script,
    configured: bool,
    calls: AtomicUsize,
}

impl MockRewriter {
    /// Always answer with `reply`
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::with_script(Script::Reply(reply.into()), true)
    }

    /// Fail the first call with `error`, then with a generic failure
    pub fn failing(error: SonaraError) -> Self {
        Self::with_script(Script::Fail(Mutex::new(Some(error))), true)
    }

    /// Return the input unchanged
    pub fn echo() -> Self {
        Self::with_script(Script::Echo, true)
    }

    /// Report itself as unconfigured
    pub fn unconfigured() -> Self {
        Self::with_script(Script::Echo, false)
    }

    fn with_script(script: Script, configured: bool) -> Self {
        Self {
            script,
            configured,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `rewrite` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRewriter for MockRewriter {
    fn rewrite(&self, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Echo => Ok(text.to_string()),
            Script::Fail(error) => {
                let taken = error.lock().ok().and_then(|mut e| e.take());
                Err(taken.unwrap_or_else(|| SonaraError::RewriteFailed {
                    reason: "mock failure".to_string(),
                }))
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn name(&self) -> &str {
        "mock"
    }
}
