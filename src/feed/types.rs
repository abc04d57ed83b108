use serde::Deserialize;

/// Normalized repository listing used by the engine (source-agnostic).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// `owner/repo`, the dedup key.
    pub identity: String,
    pub url: String,
    pub description: String,
    pub language: String,
    pub stars: u64,
    pub stars_today: u64,
    pub forks: u64,
}

/// Host every repository URL is built on.
pub const GITHUB_BASE: &str = "https://github.com";

impl Candidate {
    /// Candidate for `owner/repo` with its canonical repository URL.
    /// Listing details (description, language, forks, stars today) start empty.
    pub fn new(identity: &str, stars: u64) -> Self {
        Self {
            identity: identity.to_string(),
            url: format!("{}/{}", GITHUB_BASE, identity),
            description: String::new(),
            language: String::new(),
            stars,
            stars_today: 0,
            forks: 0,
        }
    }
}

/// Time window of the trending listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendingSince {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl TrendingSince {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// What slice of the trending page to scrape.
#[derive(Debug, Clone, Default)]
pub struct TrendingScope {
    /// Empty string means all languages.
    pub language: String,
    pub since: TrendingSince,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_canonical_repo_url() {
        let c = Candidate::new("tokio-rs/tokio", 27812);
        assert_eq!(c.url, "https://github.com/tokio-rs/tokio");
        assert_eq!(c.stars, 27812);
        assert_eq!(c.stars_today, 0);
        assert!(c.description.is_empty());
    }
}
