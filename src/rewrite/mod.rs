//! Optional LLM pre-processing of commands
//!
//! A rewriter turns a free-form request into the mapper's vocabulary before
//! mapping. It is a collaborator: any failure falls back to mapping the
//! original text, and that fallback is decided here rather than by the
//! rewriter itself.

mod gemini;
mod mock;
mod worker;

pub use gemini::{build_prompt, parse_response, GeminiRewriter, INVALID_SENTINEL};
pub use mock::MockRewriter;
pub use worker::{RewriteJob, RewriteWorker};

use crate::error::Result;
use tracing::warn;

/// A text rewriting service
pub trait TextRewriter: Send + Sync {
    /// Rewrite a request into mapper keywords
    fn rewrite(&self, text: &str) -> Result<String>;

    /// False when the rewriter cannot be called at all (e.g. missing key)
    fn is_configured(&self) -> bool;

    fn name(&self) -> &str;
}

/// Result of a rewrite attempt
///
/// On failure `text` holds the original input so callers can map it as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub success: bool,
    pub text: String,
    pub error: Option<String>,
}

impl RewriteOutcome {
    pub fn rewritten(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            error: None,
        }
    }

    pub fn fallback(original: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            text: original.into(),
            error: Some(error.into()),
        }
    }
}

/// Run a rewriter, falling back to the original text on any failure
pub fn rewrite_or_fallback(rewriter: &dyn TextRewriter, text: &str) -> RewriteOutcome {
    if !rewriter.is_configured() {
        return RewriteOutcome::fallback(text, format!("{} rewriter is not configured", rewriter.name()));
    }

    match rewriter.rewrite(text) {
        Ok(rewritten) if !rewritten.trim().is_empty() => RewriteOutcome::rewritten(rewritten.trim()),
        Ok(_) => {
            warn!(rewriter = rewriter.name(), "rewriter returned empty text");
            RewriteOutcome::fallback(text, "Rewriter returned empty text")
        }
        Err(e) => {
            warn!(rewriter = rewriter.name(), error = %e, code = e.error_code(), "rewrite failed");
            RewriteOutcome::fallback(text, e.to_string())
        }
    }
}
