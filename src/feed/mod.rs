pub mod github_trending;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::Candidate;

#[async_trait]
pub trait CandidateFeed: Send + Sync {
    /// Up to `max_count` candidates in listing order.
    async fn fetch_candidates(&mut self, max_count: usize) -> Result<Vec<Candidate>>;
}
