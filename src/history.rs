//! Durable record of repositories already pushed, backed by SQLite.
//!
//! One row per repository identity. Rows are written once after a successful
//! delivery and removed only by age-based pruning. Every write is its own
//! committed statement, so a record reported as written survives a crash.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

/// Stored timestamp layout. Lexicographic order equals chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS pushed_projects (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  repo_name TEXT UNIQUE NOT NULL,
  repo_url TEXT NOT NULL,
  stars INTEGER,
  pushed_at TEXT NOT NULL,
  description TEXT,
  language TEXT
);

CREATE INDEX IF NOT EXISTS idx_repo_name ON pushed_projects(repo_name);
CREATE INDEX IF NOT EXISTS idx_pushed_at ON pushed_projects(pushed_at);
";

/// One pushed repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub identity: String,
    pub url: String,
    pub stars: u64,
    pub recorded_at: DateTime<Utc>,
    pub description: String,
    pub language: String,
}

/// The operations the orchestrator needs from delivery history.
pub trait HistoryLog {
    fn has(&self, identity: &str) -> Result<bool>;
    fn record(
        &self,
        identity: &str,
        url: &str,
        stars: u64,
        description: &str,
        language: &str,
    ) -> Result<()>;
    fn prune(&self, retention_days: u32) -> Result<usize>;
}

pub struct HistoryStore {
    conn: Connection,
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

impl HistoryStore {
    /// Open (or create) the database file, creating its parent directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create history directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history database: {}", path.display()))?;
        conn.pragma_update_and_check(None, "journal_mode", "wal", |_| Ok(()))
            .context("Failed to enable WAL journal")?;
        conn.pragma_update(None, "synchronous", "full")
            .context("Failed to set synchronous mode")?;
        Self::init(conn)
    }

    /// Open a database that must already exist. Used by read paths so a
    /// mistyped path is an error rather than a fresh empty store.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!("history database not found: {}", path.display());
        }
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory history")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize history schema")?;
        Ok(Self { conn })
    }

    /// Insert a record stamped `now` unless one already exists for `identity`.
    /// Returns true if a row was written.
    pub fn record_at(
        &self,
        identity: &str,
        url: &str,
        stars: u64,
        description: &str,
        language: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let stars = i64::try_from(stars).unwrap_or(i64::MAX);
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO pushed_projects
                 (repo_name, repo_url, stars, pushed_at, description, language)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![identity, url, stars, format_ts(now), description, language],
            )
            .with_context(|| format!("Failed to record delivery for {}", identity))?;
        Ok(inserted > 0)
    }

    /// Delete records with `recorded_at` strictly older than `now - retention_days`.
    /// A record exactly at the boundary is kept.
    pub fn prune_at(&self, retention_days: u32, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::days(i64::from(retention_days));
        let deleted = self
            .conn
            .execute(
                "DELETE FROM pushed_projects WHERE pushed_at < ?1",
                params![format_ts(cutoff)],
            )
            .context("Failed to prune delivery history")?;
        Ok(deleted)
    }

    /// Records pushed within the last `days`, newest first.
    pub fn recent(&self, days: u32) -> Result<Vec<DeliveryRecord>> {
        self.recent_at(days, Utc::now())
    }

    pub fn recent_at(&self, days: u32, now: DateTime<Utc>) -> Result<Vec<DeliveryRecord>> {
        let since = now - Duration::days(i64::from(days));
        let mut stmt = self
            .conn
            .prepare(
                "SELECT repo_name, repo_url, stars, pushed_at, description, language
                 FROM pushed_projects
                 WHERE pushed_at >= ?1
                 ORDER BY pushed_at DESC, id DESC",
            )
            .context("Failed to prepare recent-history query")?;

        let rows = stmt
            .query_map(params![format_ts(since)], |row| {
                let stars: Option<i64> = row.get(2)?;
                let pushed_at: String = row.get(3)?;
                let description: Option<String> = row.get(4)?;
                let language: Option<String> = row.get(5)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    stars,
                    pushed_at,
                    description,
                    language,
                ))
            })
            .context("Failed to query recent history")?;

        let mut records = Vec::new();
        for row in rows {
            let (identity, url, stars, pushed_at, description, language) =
                row.context("Failed to read history row")?;
            let recorded_at = parse_ts(&pushed_at)
                .with_context(|| format!("Corrupt timestamp for {}: {:?}", identity, pushed_at))?;
            records.push(DeliveryRecord {
                identity,
                url,
                stars: stars.map_or(0, |s| s.max(0) as u64),
                recorded_at,
                description: description.unwrap_or_default(),
                language: language.unwrap_or_default(),
            });
        }
        Ok(records)
    }

    /// Number of live records.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pushed_projects", [], |row| row.get(0))
            .context("Failed to count history")?;
        Ok(count.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl HistoryLog for HistoryStore {
    fn has(&self, identity: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM pushed_projects WHERE repo_name = ?1",
                params![identity],
                |row| row.get(0),
            )
            .with_context(|| format!("Failed to look up history for {}", identity))?;
        Ok(count > 0)
    }

    fn record(
        &self,
        identity: &str,
        url: &str,
        stars: u64,
        description: &str,
        language: &str,
    ) -> Result<()> {
        if !self.record_at(identity, url, stars, description, language, Utc::now())? {
            tracing::debug!(repo = %identity, "already recorded, insert ignored");
        }
        Ok(())
    }

    fn prune(&self, retention_days: u32) -> Result<usize> {
        self.prune_at(retention_days, Utc::now())
    }
}
