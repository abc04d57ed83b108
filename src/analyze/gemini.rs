//! Gemini `generateContent` client.
//!
//! Endpoint: POST {api_base}/v1beta/models/{model}:generateContent
//! Auth: `x-goog-api-key` header.

use super::prompt::build_prompt;
use super::Summarizer;
use crate::config::SummarizerConfig;
use crate::feed::types::Candidate;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ── Wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseCandidate {
    pub content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

/// Concatenated text parts of the first response candidate; `None` if there is no text.
pub fn extract_text(resp: &GenerateResponse) -> Option<String> {
    let content = resp.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

// ── Summarizer implementation ────────────────────────────────────────

pub struct GeminiSummarizer {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    include_readme: bool,
    readme_base: String,
    readme_max_chars: usize,
}

impl GeminiSummarizer {
    pub fn new(config: &SummarizerConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .context("failed to build Gemini HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            include_readme: config.include_readme,
            readme_base: config.readme_base.trim_end_matches('/').to_string(),
            readme_max_chars: config.readme_max_chars,
        })
    }

    /// Best-effort README download. Any failure just means no excerpt.
    async fn fetch_readme(&self, identity: &str) -> Option<String> {
        let url = format!("{}/{}/HEAD/README.md", self.readme_base, identity);
        match self.client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
            Ok(resp) => {
                tracing::debug!(repo = %identity, status = %resp.status(), "README not available");
                None
            }
            Err(e) => {
                tracing::debug!(repo = %identity, error = %e, "README request failed");
                None
            }
        }
    }

    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .context("failed to parse Gemini response")?;
        extract_text(&parsed).context("Gemini returned no text")
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, candidate: &Candidate) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!(repo = %candidate.identity, "no Gemini API key configured, using fallback");
            return None;
        };

        let readme = if self.include_readme {
            self.fetch_readme(&candidate.identity).await
        } else {
            None
        };
        let prompt = build_prompt(candidate, readme.as_deref(), self.readme_max_chars);

        match self.generate(api_key, &prompt).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(repo = %candidate.identity, error = %format!("{:#}", e), "summarization failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> SummarizerConfig {
        SummarizerConfig {
            api_base: server.uri(),
            readme_base: server.uri(),
            request_timeout_ms: 2000,
            ..SummarizerConfig::default()
        }
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let resp: GenerateResponse = serde_json::from_str(
            r###"{"candidates":[{"content":{"parts":[{"text":"## Hello"},{"text":" world"}],"role":"model"}}]}"###,
        )
        .unwrap();
        assert_eq!(extract_text(&resp).as_deref(), Some("## Hello world"));
    }

    #[test]
    fn test_extract_text_empty() {
        let resp: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(&resp).is_none());

        let resp: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#).unwrap();
        assert!(extract_text(&resp).is_none());

        let resp: GenerateResponse = serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(extract_text(&resp).is_none());
    }

    #[tokio::test]
    async fn test_summarize_success() {
        let server = MockServer::start().await;
        let config = config_for(&server);
        Mock::given(method("POST"))
            .and(path(format!("/v1beta/models/{}:generateContent", config.model)))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"candidates":[{"content":{"parts":[{"text":"A great runtime."}]}}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = GeminiSummarizer::new(&config, Some("test-key".to_string())).unwrap();
        let text = summarizer.summarize(&Candidate::new("tokio-rs/tokio", 500)).await;
        assert_eq!(text.as_deref(), Some("A great runtime."));
    }

    #[tokio::test]
    async fn test_summarize_http_error_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let summarizer = GeminiSummarizer::new(&config_for(&server), Some("k".to_string())).unwrap();
        assert!(summarizer.summarize(&Candidate::new("a/b", 500)).await.is_none());
    }

    #[tokio::test]
    async fn test_summarize_without_key_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let summarizer = GeminiSummarizer::new(&config_for(&server), None).unwrap();
        assert!(summarizer.summarize(&Candidate::new("a/b", 500)).await.is_none());
    }

    #[tokio::test]
    async fn test_summarize_includes_readme_when_enabled() {
        let server = MockServer::start().await;
        let mut config = config_for(&server);
        config.include_readme = true;

        Mock::given(method("GET"))
            .and(path("/a/b/HEAD/README.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Project b\nDoes things."))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(wiremock::matchers::body_string_contains("Does things."))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer = GeminiSummarizer::new(&config, Some("k".to_string())).unwrap();
        assert_eq!(summarizer.summarize(&Candidate::new("a/b", 500)).await.as_deref(), Some("ok"));
    }
}
