use crate::feed::types::Candidate;
use anyhow::Result;
use std::collections::HashSet;

/// Outcome of one admission pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// Admitted candidates, in source order.
    pub admitted: Vec<Candidate>,
    /// Candidates actually evaluated before the quota stopped the pass.
    pub examined: usize,
    pub skipped_seen: usize,
    pub skipped_below_threshold: usize,
    pub skipped_duplicate: usize,
}

/// Select the candidates to process this run.
///
/// Single pass in input order: skip anything `already_seen`, anything under
/// `min_stars`, and repeats of an identity already admitted in this pass.
/// Evaluation stops as soon as `quota` candidates are admitted, so later
/// candidates never reach `already_seen`. An `already_seen` error aborts the pass.
pub fn admit<F>(
    candidates: &[Candidate],
    mut already_seen: F,
    min_stars: u64,
    quota: usize,
) -> Result<Admission>
where
    F: FnMut(&str) -> Result<bool>,
{
    let mut out = Admission::default();
    if quota == 0 {
        return Ok(out);
    }

    let mut taken: HashSet<&str> = HashSet::new();

    for candidate in candidates {
        out.examined += 1;

        if taken.contains(candidate.identity.as_str()) {
            out.skipped_duplicate += 1;
            tracing::debug!(repo = %candidate.identity, "skipping duplicate listing");
            continue;
        }

        if already_seen(&candidate.identity)? {
            out.skipped_seen += 1;
            tracing::info!(repo = %candidate.identity, "skipping (already pushed)");
            continue;
        }

        if candidate.stars < min_stars {
            out.skipped_below_threshold += 1;
            tracing::info!(
                repo = %candidate.identity,
                stars = candidate.stars,
                min_stars,
                "skipping (below star threshold)"
            );
            continue;
        }

        taken.insert(candidate.identity.as_str());
        out.admitted.push(candidate.clone());

        if out.admitted.len() >= quota {
            tracing::info!(quota, "reached per-run limit");
            break;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ids(admission: &Admission) -> Vec<&str> {
        admission.admitted.iter().map(|c| c.identity.as_str()).collect()
    }

    #[test]
    fn test_admit_filters_and_preserves_order() {
        let candidates = vec![
            Candidate::new("x/a", 500),
            Candidate::new("x/b", 50),
            Candidate::new("x/c", 1000),
            Candidate::new("x/d", 300),
        ];
        let seen = |id: &str| -> Result<bool> { Ok(id == "x/c") };

        let result = admit(&candidates, seen, 100, 2).unwrap();
        assert_eq!(ids(&result), vec!["x/a", "x/d"]);
        assert_eq!(result.examined, 4);
        assert_eq!(result.skipped_seen, 1);
        assert_eq!(result.skipped_below_threshold, 1);
    }

    #[test]
    fn test_quota_stops_evaluation() {
        let candidates = vec![Candidate::new("x/a", 500), Candidate::new("x/b", 900)];
        let calls = Cell::new(0);
        let seen = |_: &str| -> Result<bool> {
            calls.set(calls.get() + 1);
            Ok(false)
        };

        let result = admit(&candidates, seen, 100, 1).unwrap();
        assert_eq!(ids(&result), vec!["x/a"]);
        assert_eq!(calls.get(), 1, "x/b must never be looked up");
        assert_eq!(result.examined, 1);
    }

    #[test]
    fn test_zero_quota_admits_nothing() {
        let candidates = vec![Candidate::new("x/a", 500)];
        let calls = Cell::new(0);
        let seen = |_: &str| -> Result<bool> {
            calls.set(calls.get() + 1);
            Ok(false)
        };

        let result = admit(&candidates, seen, 0, 0).unwrap();
        assert!(result.admitted.is_empty());
        assert_eq!(calls.get(), 0);
        assert_eq!(result.examined, 0);
    }

    #[test]
    fn test_empty_candidates() {
        let result = admit(&[], |_: &str| Ok(false), 100, 3).unwrap();
        assert_eq!(result, Admission::default());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let candidates = vec![Candidate::new("x/edge", 100), Candidate::new("x/under", 99)];
        let result = admit(&candidates, |_: &str| Ok(false), 100, 5).unwrap();
        assert_eq!(ids(&result), vec!["x/edge"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = vec![
            Candidate::new("x/second", 700),
            Candidate::new("x/first", 700),
            Candidate::new("x/big", 9000),
        ];
        let result = admit(&candidates, |_: &str| Ok(false), 100, 3).unwrap();
        assert_eq!(ids(&result), vec!["x/second", "x/first", "x/big"]);
    }

    #[test]
    fn test_duplicate_listing_admitted_once() {
        let candidates = vec![
            Candidate::new("x/a", 500),
            Candidate::new("x/a", 500),
            Candidate::new("x/b", 500),
        ];
        let result = admit(&candidates, |_: &str| Ok(false), 100, 3).unwrap();
        assert_eq!(ids(&result), vec!["x/a", "x/b"]);
        assert_eq!(result.skipped_duplicate, 1);
    }

    #[test]
    fn test_lookup_error_aborts() {
        let candidates = vec![Candidate::new("x/a", 500)];
        let result = admit(&candidates, |_: &str| anyhow::bail!("disk gone"), 100, 3);
        assert!(result.is_err());
    }
}
