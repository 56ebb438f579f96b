use crate::model::{MatchRule, MatchScore};
use crate::normalizer::normalize;

pub const DEFAULT_THRESHOLD: f64 = 0.85;

const CONTAINMENT_CONFIDENCE: f64 = 0.95;
/// Shorter name must be at least this long for a substring hit to count,
/// otherwise a lone initial like "A" would match everything.
const MIN_CONTAINED_CHARS: usize = 3;

/// Scores `candidate` against `searched` with the default threshold.
pub fn score(searched: &str, candidate: &str) -> MatchScore {
    score_with_threshold(searched, candidate, DEFAULT_THRESHOLD)
}

/// Rules are tried in order and the first one that applies decides:
/// exact match, containment, then normalized Levenshtein ratio.
/// Reordered name parts ("Smith, John" vs "John Smith") are not recognised.
pub fn score_with_threshold(searched: &str, candidate: &str, threshold: f64) -> MatchScore {
    let a = normalize(searched);
    let b = normalize(candidate);

    if a == b {
        return MatchScore {
            verdict: true,
            confidence: 1.0,
            rule: MatchRule::Exact,
        };
    }

    let (shorter, longer) = if a.char_len() <= b.char_len() { (&a, &b) } else { (&b, &a) };
    if shorter.char_len() >= MIN_CONTAINED_CHARS && longer.as_str().contains(shorter.as_str()) {
        return MatchScore {
            verdict: true,
            confidence: CONTAINMENT_CONFIDENCE,
            rule: MatchRule::Containment,
        };
    }

    let ratio = strsim::normalized_levenshtein(a.as_str(), b.as_str());
    MatchScore {
        verdict: ratio >= threshold,
        confidence: ratio,
        rule: MatchRule::Fuzzy,
    }
}
