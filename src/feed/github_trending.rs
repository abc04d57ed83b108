//! GitHub trending page scraper.
//!
//! Endpoint: https://github.com/trending/{language}?since={daily|weekly|monthly}
//! The page is server-rendered HTML; each repository is an `article.Box-row`.

use super::types::*;
use super::CandidateFeed;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// ── Parsing ───────────────────────────────────────────────────────────

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("invalid selector {:?}: {:?}", css, e))
}

/// Collapse all runs of whitespace in an element's text to single spaces.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading count of strings like "12,345" or "1,024 stars today".
fn parse_count(s: &str) -> Option<u64> {
    let digits: String = s
        .trim()
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    digits.parse().ok()
}

/// "/owner/repo" -> "owner/repo". Anything else (user pages, deeper paths) is rejected.
fn identity_from_href(href: &str) -> Option<String> {
    let path = href.trim().trim_matches('/');
    let mut parts = path.split('/');
    let owner = parts.next().filter(|p| !p.is_empty())?;
    let repo = parts.next().filter(|p| !p.is_empty())?;
    if parts.next().is_some() {
        return None;
    }
    Some(format!("{}/{}", owner, repo))
}

/// Parse the trending page HTML into candidates, in page order.
/// Public for unit testing with fixtures.
pub fn parse_trending_html(html: &str) -> Result<Vec<Candidate>> {
    let row_sel = selector("article.Box-row")?;
    let name_sel = selector("h2 a[href]")?;
    let desc_sel = selector("p")?;
    let lang_sel = selector(r#"[itemprop="programmingLanguage"]"#)?;
    let stars_sel = selector(r#"a[href$="/stargazers"]"#)?;
    let forks_sel = selector(r#"a[href$="/forks"]"#)?;
    let today_sel = selector("span.float-sm-right")?;

    let document = Html::parse_document(html);
    let mut candidates = Vec::new();

    for row in document.select(&row_sel) {
        let Some(identity) = row
            .select(&name_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(identity_from_href)
        else {
            continue;
        };

        let first_count = |sel: &Selector| {
            row.select(sel)
                .next()
                .and_then(|el| parse_count(&element_text(el)))
                .unwrap_or(0)
        };

        candidates.push(Candidate {
            description: row.select(&desc_sel).next().map(element_text).unwrap_or_default(),
            language: row.select(&lang_sel).next().map(element_text).unwrap_or_default(),
            forks: first_count(&forks_sel),
            stars_today: first_count(&today_sel),
            ..Candidate::new(&identity, first_count(&stars_sel))
        });
    }

    Ok(candidates)
}

// ── CandidateFeed implementation ─────────────────────────────────────

pub struct GitHubTrendingFeed {
    client: Client,
    base_url: Url,
    scope: TrendingScope,
}

impl GitHubTrendingFeed {
    pub fn new(base_url: &str, scope: TrendingScope, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build trending HTTP client")?;

        Ok(Self {
            client,
            base_url: Url::parse(base_url.trim_end_matches('/'))
                .with_context(|| format!("invalid trending base URL: {}", base_url))?,
            scope,
        })
    }

    /// Listing URL for the configured scope. The language is appended as an
    /// encoded path segment, so names like `c#` stay in the path.
    fn build_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        let language = self.scope.language.trim();
        if !language.is_empty() {
            url.path_segments_mut()
                .map_err(|_| anyhow::anyhow!("trending base URL cannot take a path: {}", self.base_url))?
                .pop_if_empty()
                .push(&language.to_lowercase());
        }
        url.query_pairs_mut().append_pair("since", self.scope.since.as_str());
        Ok(url)
    }
}

#[async_trait]
impl CandidateFeed for GitHubTrendingFeed {
    async fn fetch_candidates(&mut self, max_count: usize) -> Result<Vec<Candidate>> {
        let url = self.build_url()?;
        tracing::info!(url = %url, max_count, "fetching trending listing");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("trending page request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("trending page HTTP {}", status);
        }

        let html = resp.text().await.context("trending page read failed")?;
        let mut candidates = parse_trending_html(&html)?;
        candidates.truncate(max_count);

        tracing::info!(count = candidates.len(), "trending candidates parsed");
        Ok(candidates)
    }
}
