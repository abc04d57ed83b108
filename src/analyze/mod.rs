pub mod gemini;
pub mod prompt;

use crate::feed::types::Candidate;
use async_trait::async_trait;

/// Produces a human-readable write-up for one repository.
///
/// Implementations swallow their own failures: `None` means no summary is
/// available and the caller falls back to [`prompt::fallback_summary`].
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, candidate: &Candidate) -> Option<String>;
}
