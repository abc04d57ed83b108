//! Notification builders. Pure formatting, no I/O.

use crate::analyze::prompt::thousands;
use crate::feed::types::Candidate;
use crate::pipeline::RunResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Min,
    Low,
    #[default]
    Default,
    High,
    Urgent,
}

impl Priority {
    /// ntfy numeric priority (1 = min .. 5 = urgent).
    pub fn level(self) -> u8 {
        match self {
            Self::Min => 1,
            Self::Low => 2,
            Self::Default => 3,
            Self::High => 4,
            Self::Urgent => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Low => "low",
            Self::Default => "default",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub click_url: Option<String>,
}

pub fn candidate_notification(candidate: &Candidate, summary: &str) -> Notification {
    let language = if candidate.language.trim().is_empty() {
        "unknown"
    } else {
        candidate.language.as_str()
    };

    let body = format!(
        "{}\n\
         \n\
         **Stats**\n\
         Stars: {} | Forks: {}\n\
         Stars today: +{}\n\
         Language: {}\n\
         \n\
         {}\n",
        summary.trim(),
        thousands(candidate.stars),
        thousands(candidate.forks),
        thousands(candidate.stars_today),
        language,
        candidate.url,
    );

    Notification {
        title: format!("{} (+{} stars)", candidate.identity, thousands(candidate.stars_today)),
        body,
        priority: Priority::Default,
        tags: vec!["github".to_string(), "trending".to_string()],
        click_url: Some(candidate.url.clone()),
    }
}

/// End-of-run report. Counts only.
pub fn run_summary_notification(result: &RunResult) -> Notification {
    let body = format!(
        "Candidates examined: {}\n\
         Admitted this run: {}\n\
         Delivered: {}\n",
        result.candidates_examined, result.candidates_admitted, result.deliveries_succeeded,
    );

    Notification {
        title: "GitHub trending run complete".to_string(),
        body,
        priority: Priority::Low,
        tags: vec!["summary".to_string()],
        click_url: None,
    }
}

/// Sent by the binary when a run aborts, so a failure never looks like a quiet day.
pub fn failure_notification(error: &anyhow::Error) -> Notification {
    Notification {
        title: "GitHub trending run failed".to_string(),
        body: format!("The run aborted before completing:\n\n{:#}\n", error),
        priority: Priority::High,
        tags: vec!["warning".to_string()],
        click_url: None,
    }
}
