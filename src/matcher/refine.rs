use crate::matcher::similarity::score_with_threshold;
use crate::model::{DecisionReason, MatchDecision, SearchResultRecord};
use std::collections::HashMap;
use tracing::debug;

/// Output of a refinement pass.
#[derive(Debug, Clone, Default)]
pub struct Refinement {
    /// Matching records in input order.
    pub kept: Vec<SearchResultRecord>,
    /// One entry per input record, kept or not.
    pub decisions: Vec<MatchDecision>,
}

impl Refinement {
    pub fn dropped(&self) -> impl Iterator<Item = &MatchDecision> {
        self.decisions.iter().filter(|d| !d.keep)
    }

    pub fn dropped_count(&self) -> usize {
        self.dropped().count()
    }
}

/// Per-author change summary for the changes log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorChange {
    pub author: String,
    pub before: usize,
    pub after: usize,
    pub removed: usize,
}

/// Keeps the records whose catalog author matches the searched author.
/// Records with a missing author are dropped without scoring.
pub fn refine(records: &[SearchResultRecord], threshold: f64) -> Refinement {
    let mut result = Refinement {
        kept: Vec::new(),
        decisions: Vec::with_capacity(records.len()),
    };

    for record in records {
        let decision = decide(record, threshold);
        debug!(
            book_id = %record.book_id,
            searched = %record.searched_author,
            keep = decision.keep,
            confidence = decision.confidence,
            reason = %decision.reason,
            "Refinement decision"
        );
        if decision.keep {
            result.kept.push(record.clone());
        }
        result.decisions.push(decision);
    }

    result
}

fn decide(record: &SearchResultRecord, threshold: f64) -> MatchDecision {
    let missing = if record.searched_author.trim().is_empty() {
        Some("searched_author")
    } else {
        match record.candidate_author.as_deref() {
            Some(name) if !name.trim().is_empty() => None,
            _ => Some("candidate_author"),
        }
    };

    if let Some(field) = missing {
        return MatchDecision {
            record: record.clone(),
            keep: false,
            confidence: 0.0,
            reason: DecisionReason::MissingField(field),
        };
    }

    let candidate = record.candidate_author.as_deref().unwrap_or_default();
    let score = score_with_threshold(&record.searched_author, candidate, threshold);
    MatchDecision {
        record: record.clone(),
        keep: score.verdict,
        confidence: score.confidence,
        reason: DecisionReason::Scored(score.rule),
    }
}

/// Counts before/after per searched author, most removals first.
/// Authors that lost nothing are left out.
pub fn summarize_by_author(decisions: &[MatchDecision]) -> Vec<AuthorChange> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for decision in decisions {
        let entry = counts
            .entry(decision.record.searched_author.as_str())
            .or_default();
        entry.0 += 1;
        if decision.keep {
            entry.1 += 1;
        }
    }

    let mut changes: Vec<AuthorChange> = counts
        .into_iter()
        .filter(|(_, (before, after))| before != after)
        .map(|(author, (before, after))| AuthorChange {
            author: author.to_string(),
            before,
            after,
            removed: before - after,
        })
        .collect();

    changes.sort_by(|a, b| b.removed.cmp(&a.removed).then_with(|| a.author.cmp(&b.author)));
    changes
}
