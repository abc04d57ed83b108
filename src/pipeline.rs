//! One batch pass: prune history, pull candidates, admit, summarize,
//! deliver, record, report.
//!
//! Everything runs strictly in sequence; a candidate is fully summarized,
//! delivered and recorded before the next one starts.

use crate::analyze::prompt::fallback_summary;
use crate::analyze::Summarizer;
use crate::config::Config;
use crate::engine::admission::admit;
use crate::feed::CandidateFeed;
use crate::history::HistoryLog;
use crate::notify::message::{candidate_notification, run_summary_notification};
use crate::notify::DeliverySink;
use anyhow::{Context, Result};

/// Per-run knobs, resolved from [`Config`] once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub min_stars: u64,
    pub max_per_run: usize,
    /// Candidates fetched per quota slot, to make up for rejections.
    pub overfetch_multiplier: usize,
    pub retention_days: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            min_stars: 100,
            max_per_run: 3,
            overfetch_multiplier: 2,
            retention_days: 365,
        }
    }
}

impl RunConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_stars: config.admission.min_stars,
            max_per_run: config.admission.max_per_run,
            overfetch_multiplier: config.admission.overfetch_multiplier,
            retention_days: config.history.retention_days,
        }
    }

    fn fetch_count(&self) -> usize {
        self.max_per_run.saturating_mul(self.overfetch_multiplier.max(1))
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunResult {
    pub candidates_examined: usize,
    pub candidates_admitted: usize,
    pub deliveries_succeeded: usize,
}

pub struct RunOrchestrator<'a> {
    history: &'a dyn HistoryLog,
    feed: &'a mut dyn CandidateFeed,
    summarizer: &'a dyn Summarizer,
    sink: &'a dyn DeliverySink,
    config: RunConfig,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(
        history: &'a dyn HistoryLog,
        feed: &'a mut dyn CandidateFeed,
        summarizer: &'a dyn Summarizer,
        sink: &'a dyn DeliverySink,
        config: RunConfig,
    ) -> Self {
        Self {
            history,
            feed,
            summarizer,
            sink,
            config,
        }
    }

    /// Execute one pass. Only history faults are returned as errors; adapter
    /// failures are absorbed (fallback summary, skipped record).
    pub async fn run(&mut self) -> Result<RunResult> {
        let history = self.history;
        let cfg = self.config;

        let pruned = history
            .prune(cfg.retention_days)
            .context("history prune failed")?;
        tracing::info!(pruned, retention_days = cfg.retention_days, "history pruned");

        let fetch_count = cfg.fetch_count();
        let candidates = if fetch_count == 0 {
            Vec::new()
        } else {
            match self.feed.fetch_candidates(fetch_count).await {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = %format!("{:#}", e), "candidate feed failed, treating as empty");
                    Vec::new()
                }
            }
        };
        tracing::info!(count = candidates.len(), requested = fetch_count, "candidates fetched");

        let admission = admit(
            &candidates,
            |identity: &str| history.has(identity),
            cfg.min_stars,
            cfg.max_per_run,
        )
        .context("admission check failed")?;

        let mut result = RunResult {
            candidates_examined: admission.examined,
            candidates_admitted: admission.admitted.len(),
            deliveries_succeeded: 0,
        };

        if admission.admitted.is_empty() {
            tracing::info!(
                examined = admission.examined,
                skipped_seen = admission.skipped_seen,
                skipped_below_threshold = admission.skipped_below_threshold,
                "nothing new to push"
            );
        }

        for candidate in &admission.admitted {
            tracing::info!(
                repo = %candidate.identity,
                stars = candidate.stars,
                stars_today = candidate.stars_today,
                "processing"
            );

            let summary = match self.summarizer.summarize(candidate).await {
                Some(text) => text,
                None => {
                    tracing::warn!(repo = %candidate.identity, "using fallback summary");
                    fallback_summary(candidate)
                }
            };

            let notification = candidate_notification(candidate, &summary);
            if !self.sink.deliver(&notification).await {
                tracing::warn!(repo = %candidate.identity, "delivery failed, will retry next run");
                continue;
            }

            history
                .record(
                    &candidate.identity,
                    &candidate.url,
                    candidate.stars,
                    &candidate.description,
                    &candidate.language,
                )
                .with_context(|| format!("recording {} failed", candidate.identity))?;
            result.deliveries_succeeded += 1;
        }

        tracing::info!(
            examined = result.candidates_examined,
            admitted = result.candidates_admitted,
            succeeded = result.deliveries_succeeded,
            "run complete"
        );

        if !self.sink.deliver(&run_summary_notification(&result)).await {
            tracing::warn!("run summary notification failed");
        }

        Ok(result)
    }
}
