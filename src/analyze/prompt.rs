//! Prompt and fallback text builders. Pure functions, no I/O.

use crate::feed::types::Candidate;

/// Render an integer with thousands separators: 27812 -> "27,812".
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// First `max_chars` characters of `s` (never splits a UTF-8 sequence).
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn or_unknown(s: &str) -> &str {
    if s.trim().is_empty() {
        "unknown"
    } else {
        s
    }
}

pub fn build_prompt(candidate: &Candidate, readme: Option<&str>, readme_max_chars: usize) -> String {
    let mut prompt = format!(
        "Analyze this trending GitHub project and write a concise, professional summary.\n\
         \n\
         Name: {}\n\
         URL: {}\n\
         Description: {}\n\
         Language: {}\n\
         Stars: {}\n\
         Stars today: {}\n",
        candidate.identity,
        candidate.url,
        or_unknown(&candidate.description),
        or_unknown(&candidate.language),
        thousands(candidate.stars),
        thousands(candidate.stars_today),
    );

    if let Some(readme) = readme.map(str::trim).filter(|r| !r.is_empty()) {
        prompt.push_str("\nREADME excerpt:\n");
        prompt.push_str(truncate_chars(readme, readme_max_chars));
        prompt.push('\n');
    }

    prompt.push_str(
        "\nCover the following, briefly:\n\
         \n\
         1. **What it does** (2-3 sentences on the core functionality)\n\
         2. **How it works** (tech stack and core implementation approach)\n\
         3. **Architecture** (main architectural patterns and notable design choices)\n\
         4. **Use cases** (where it fits best)\n\
         5. **Why it matters** (why it is worth watching)\n\
         \n\
         Answer in Markdown, keep each section tight, 300 words at most in total.\n",
    );
    prompt
}

/// Summary used when the summarizer is unavailable. Built only from the candidate itself.
pub fn fallback_summary(candidate: &Candidate) -> String {
    format!(
        "## {}\n\
         \n\
         **Description**: {}\n\
         \n\
         **Details**:\n\
         - Language: {}\n\
         - Stars: {}\n\
         - Stars today: {}\n\
         - Link: {}\n\
         \n\
         *Automatic analysis was unavailable; open the link for details.*\n",
        candidate.identity,
        or_unknown(&candidate.description),
        or_unknown(&candidate.language),
        thousands(candidate.stars),
        thousands(candidate.stars_today),
        candidate.url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Candidate {
        Candidate {
            identity: "tokio-rs/tokio".to_string(),
            url: "https://github.com/tokio-rs/tokio".to_string(),
            description: "An async runtime".to_string(),
            language: "Rust".to_string(),
            stars: 27812,
            stars_today: 1024,
            forks: 2563,
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(27812), "27,812");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_truncate_chars_respects_utf8() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("项目描述", 2), "项目");
    }

    #[test]
    fn test_prompt_contains_candidate_fields() {
        let prompt = build_prompt(&sample(), None, 2000);
        assert!(prompt.contains("tokio-rs/tokio"));
        assert!(prompt.contains("https://github.com/tokio-rs/tokio"));
        assert!(prompt.contains("Stars: 27,812"));
        assert!(prompt.contains("Stars today: 1,024"));
        assert!(!prompt.contains("README"));
    }

    #[test]
    fn test_prompt_truncates_readme() {
        let readme = "x".repeat(5000);
        let prompt = build_prompt(&sample(), Some(&readme), 2000);
        assert!(prompt.contains("README excerpt"));
        assert!(prompt.contains(&"x".repeat(2000)));
        assert!(!prompt.contains(&"x".repeat(2001)));
    }

    #[test]
    fn test_prompt_skips_blank_readme() {
        let prompt = build_prompt(&sample(), Some("   \n"), 2000);
        assert!(!prompt.contains("README"));
    }

    #[test]
    fn test_fallback_has_name_url_and_stars() {
        let text = fallback_summary(&sample());
        assert!(text.contains("tokio-rs/tokio"));
        assert!(text.contains("https://github.com/tokio-rs/tokio"));
        assert!(text.contains("27,812"));
    }

    #[test]
    fn test_fallback_with_empty_fields() {
        let text = fallback_summary(&Candidate::new("a/b", 5));
        assert!(text.contains("**Description**: unknown"));
        assert!(text.contains("Language: unknown"));
    }
}
