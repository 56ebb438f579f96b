// Human-readable summaries, written to the log
use crate::matcher::{summarize_by_author, Refinement};
use crate::model::CheckedBook;
use tracing::info;

const SUMMARY_DESCRIPTION_CHARS: usize = 200;
const TOP_CHANGED_AUTHORS: usize = 10;

pub fn log_refinement_summary(refinement: &Refinement) {
    for decision in refinement.dropped() {
        let record = &decision.record;
        info!(
            "✗ Removed: '{}' by {} (searched {}, {})",
            record.title,
            record.candidate_author.as_deref().unwrap_or("<unknown>"),
            record.searched_author,
            decision.reason
        );
    }

    let changes = summarize_by_author(&refinement.decisions);
    info!("REFINEMENT SUMMARY");
    info!("Authors with changes: {}", changes.len());
    info!("Total books before: {}", refinement.decisions.len());
    info!("Total books after: {}", refinement.kept.len());
    info!("Books removed: {}", refinement.dropped_count());

    for (i, change) in changes.iter().take(TOP_CHANGED_AUTHORS).enumerate() {
        info!(
            "{}. {}: removed {} books ({} → {})",
            i + 1,
            change.author,
            change.removed,
            change.before,
            change.after
        );
    }
}

pub fn log_availability_summary(books: &[CheckedBook]) {
    let available: Vec<&CheckedBook> = books.iter().filter(|b| b.availability.is_available).collect();
    info!("SUMMARY: {} of {} books available to borrow", available.len(), books.len());

    for book in available {
        info!("📚 {}", book.book.title);
        info!("   by {}", book.book.searched_author);
        info!("   Available: {} copies", book.availability.counts());
        info!("   URL: {}", book.availability.borrow_url);
        if !book.availability.description.is_empty() {
            info!(
                "   Summary: {}",
                truncate(&book.availability.description, SUMMARY_DESCRIPTION_CHARS)
            );
        }
    }
}

/// Cuts `text` to at most `max` chars, ending in "..." when shortened.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
