use crate::feed::types::{TrendingScope, TrendingSince};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub admission: AdmissionConfig,
    pub history: HistoryConfig,
    pub trending: TrendingConfig,
    pub summarizer: SummarizerConfig,
    pub notifier: NotifierConfig,
    /// Write logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdmissionConfig {
    #[serde(default = "default_min_stars")]
    pub min_stars: u64,
    #[serde(default = "default_max_per_run")]
    pub max_per_run: usize,
    #[serde(default = "default_overfetch")]
    pub overfetch_multiplier: usize,
}

fn default_min_stars() -> u64 { 100 }
fn default_max_per_run() -> usize { 3 }
fn default_overfetch() -> usize { 2 }

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            min_stars: default_min_stars(),
            max_per_run: default_max_per_run(),
            overfetch_multiplier: default_overfetch(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_db_path() -> PathBuf { PathBuf::from("data/trending.db") }
fn default_retention_days() -> u32 { 365 }

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            retention_days: default_retention_days(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrendingConfig {
    #[serde(default = "default_trending_url")]
    pub base_url: String,
    /// Empty means all languages.
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub since: TrendingSince,
    #[serde(default = "default_trending_timeout")]
    pub request_timeout_ms: u64,
}

fn default_trending_url() -> String { "https://github.com/trending".to_string() }
fn default_trending_timeout() -> u64 { 15_000 }

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            base_url: default_trending_url(),
            language: String::new(),
            since: TrendingSince::default(),
            request_timeout_ms: default_trending_timeout(),
        }
    }
}

impl TrendingConfig {
    pub fn scope(&self) -> TrendingScope {
        TrendingScope {
            language: self.language.clone(),
            since: self.since,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_gemini_base")]
    pub api_base: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_summarizer_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub include_readme: bool,
    #[serde(default = "default_readme_base")]
    pub readme_base: String,
    #[serde(default = "default_readme_max_chars")]
    pub readme_max_chars: usize,
}

fn default_gemini_base() -> String { "https://generativelanguage.googleapis.com".to_string() }
fn default_gemini_model() -> String { "gemini-2.5-flash".to_string() }
fn default_summarizer_timeout() -> u64 { 120_000 }
fn default_readme_base() -> String { "https://raw.githubusercontent.com".to_string() }
fn default_readme_max_chars() -> usize { 2000 }

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_base: default_gemini_base(),
            model: default_gemini_model(),
            request_timeout_ms: default_summarizer_timeout(),
            include_readme: false,
            readme_base: default_readme_base(),
            readme_max_chars: default_readme_max_chars(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    #[serde(default = "default_ntfy_server")]
    pub server: String,
    #[serde(default = "default_ntfy_topic")]
    pub topic: String,
    #[serde(default = "default_ntfy_timeout")]
    pub request_timeout_ms: u64,
    /// Log notifications instead of publishing them.
    #[serde(default)]
    pub dry_run: bool,
}

fn default_ntfy_server() -> String { "https://ntfy.sh".to_string() }
fn default_ntfy_topic() -> String { "github-trending-daily".to_string() }
fn default_ntfy_timeout() -> u64 { 30_000 }

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            server: default_ntfy_server(),
            topic: default_ntfy_topic(),
            request_timeout_ms: default_ntfy_timeout(),
            dry_run: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config TOML")
    }

    /// Like [`Config::load`], but a missing file is `None` rather than an error.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let content = match std::fs::read_to_string(ENV_FILE) {
            Ok(c) => c,
            Err(_) => return,
        };
        for (key, value) in parse_env_lines(&content) {
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    /// Apply the deployment's environment overrides on top of the file config.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("NTFY_TOPIC") {
            self.notifier.topic = v;
        }
        if let Some(v) = get("NTFY_SERVER") {
            self.notifier.server = v;
        }
        if let Some(v) = get("TRENDING_LANGUAGE") {
            self.trending.language = v;
        }
        if let Some(v) = get("DB_PATH") {
            self.history.db_path = PathBuf::from(v);
        }
        if let Some(v) = get("MAX_PROJECTS_PER_RUN") {
            self.admission.max_per_run = v
                .parse()
                .with_context(|| format!("MAX_PROJECTS_PER_RUN is not a number: {:?}", v))?;
        }
        if let Some(v) = get("MIN_STARS_THRESHOLD") {
            self.admission.min_stars = v
                .parse()
                .with_context(|| format!("MIN_STARS_THRESHOLD is not a number: {:?}", v))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.notifier.server.trim().is_empty() {
            anyhow::bail!("notifier.server must not be empty");
        }
        if self.notifier.topic.trim().is_empty() {
            anyhow::bail!("notifier.topic must not be empty");
        }
        if self.admission.overfetch_multiplier == 0 {
            anyhow::bail!("admission.overfetch_multiplier must be >= 1");
        }
        if self.history.retention_days == 0 {
            anyhow::bail!("history.retention_days must be >= 1");
        }
        Ok(())
    }

    /// Gemini key from the environment. `None` means every summary falls back.
    pub fn gemini_api_key() -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| sanitize_key(&k))
            .filter(|k| !k.is_empty())
    }
}

/// `KEY=value` pairs from .env content; comments, blanks and a BOM are ignored.
fn parse_env_lines(content: &str) -> Vec<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"').trim_matches('\'')))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Strip whitespace, quotes, and stray control characters from a pasted key.
fn sanitize_key(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .trim_matches('\'')
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.admission.min_stars, 100);
        assert_eq!(config.admission.max_per_run, 3);
        assert_eq!(config.admission.overfetch_multiplier, 2);
        assert_eq!(config.history.retention_days, 365);
        assert_eq!(config.history.db_path, PathBuf::from("data/trending.db"));
        assert_eq!(config.trending.since, TrendingSince::Daily);
        assert_eq!(config.notifier.server, "https://ntfy.sh");
        assert_eq!(config.notifier.request_timeout_ms, 30_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_optional(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_optional_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[admission]\nmin_stars = 250\n").unwrap();
        let config = Config::load_optional(&path).unwrap().unwrap();
        assert_eq!(config.admission.min_stars, 250);
        assert_eq!(config.admission.max_per_run, 3);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            log_file = "trending.log"

            [admission]
            max_per_run = 5

            [trending]
            language = "rust"
            since = "weekly"

            [notifier]
            topic = "my-topic"
            dry_run = true
            "#,
        )
        .unwrap();
        assert_eq!(config.admission.max_per_run, 5);
        assert_eq!(config.admission.min_stars, 100);
        assert_eq!(config.trending.scope().language, "rust");
        assert_eq!(config.trending.since, TrendingSince::Weekly);
        assert_eq!(config.notifier.topic, "my-topic");
        assert!(config.notifier.dry_run);
        assert_eq!(config.log_file, Some(PathBuf::from("trending.log")));
    }

    #[test]
    fn test_invalid_since_rejected() {
        assert!(Config::parse("[trending]\nsince = \"hourly\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("NTFY_TOPIC", "alerts"),
            ("DB_PATH", "/tmp/t.db"),
            ("MAX_PROJECTS_PER_RUN", "7"),
            ("MIN_STARS_THRESHOLD", " 250 "),
            ("TRENDING_LANGUAGE", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.trending.language = "go".to_string();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.notifier.topic, "alerts");
        assert_eq!(config.history.db_path, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.admission.max_per_run, 7);
        assert_eq!(config.admission.min_stars, 250);
        assert_eq!(config.trending.language, "go", "empty override is ignored");
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(|k| (k == "MAX_PROJECTS_PER_RUN").then(|| "three".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_overfetch() {
        let mut config = Config::default();
        config.admission.overfetch_multiplier = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_env_lines() {
        let content = "\u{feff}# comment\nGEMINI_API_KEY=\"abc\"\n\nNTFY_TOPIC = topic\nbroken\n";
        let pairs = parse_env_lines(content);
        assert_eq!(pairs, vec![("GEMINI_API_KEY", "abc"), ("NTFY_TOPIC", "topic")]);
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("  'abc\u{7}'\n"), "abc");
    }
}
