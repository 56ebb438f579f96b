// Title detail page: copy counters and description from the inline data blob
use crate::model::{AvailabilityRecord, ParseError};
use crate::parser::text::{clean_html, unescape_json_str};
use crate::parser::OverDriveParser;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, warn};

static AVAILABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""?\bavailableCopies\b"?\s*:\s*(\d+)"#).expect("valid regex"));
static OWNED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""?\bownedCopies\b"?\s*:\s*(\d+)"#).expect("valid regex"));
static TITLE_COLLECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"window\.OverDrive\.titleCollection\s*=\s*\{").expect("valid regex")
});
// The description right after the publisher object; earlier ones are BISAC subject labels.
static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""publisher":[^}]+\},"description":"((?:[^"\\]|\\.)*?)""#).expect("valid regex")
});
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""title":"((?:[^"\\]|\\.)+)""#).expect("valid regex"));
static BODY_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"article[class^="TitleDetailsDescription-description"]"#)
        .expect("valid selector")
});

impl OverDriveParser {
    /// Reads availability from a title detail page.
    ///
    /// Fails only when the copy counters are absent. Inconsistent counters
    /// (more available than owned) are clamped to zero available.
    pub fn extract(&self, book_id: &str, page_markup: &str) -> Result<AvailabilityRecord, ParseError> {
        let available = capture_counter(&AVAILABLE_RE, page_markup, book_id, "availableCopies")?;
        let total = capture_counter(&OWNED_RE, page_markup, book_id, "ownedCopies")?;

        let (available, total) = match (available, total) {
            (Some(a), Some(t)) => (a, t),
            _ => {
                return Err(ParseError::MissingCounters {
                    book_id: book_id.to_string(),
                });
            }
        };

        let counters_clamped = available > total;
        let available = if counters_clamped {
            warn!(
                book_id,
                available, total, "Inconsistent copy counters, treating as unavailable"
            );
            0
        } else {
            available
        };

        let blob = title_object(page_markup);
        let description = extract_description(page_markup, blob);
        let title = blob
            .and_then(|b| TITLE_RE.captures(b))
            .map(|caps| unescape_json_str(&caps[1]));

        debug!(book_id, available, total, "Parsed availability");

        Ok(AvailabilityRecord {
            book_id: book_id.to_string(),
            title,
            is_available: available > 0,
            available_copies: available,
            total_copies: total,
            borrow_url: self.borrow_url(book_id),
            description,
            counters_clamped,
            fetched_at: Utc::now(),
        })
    }
}

fn capture_counter(
    re: &Regex,
    markup: &str,
    book_id: &str,
    field: &'static str,
) -> Result<Option<u32>, ParseError> {
    let Some(caps) = re.captures(markup) else {
        return Ok(None);
    };
    caps[1]
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ParseError::InvalidCounter {
            book_id: book_id.to_string(),
            field,
            value: caps[1].to_string(),
        })
}

/// The `titleCollection` object literal, from its opening brace to the matching
/// close. Braces inside JSON strings are skipped. An unterminated object runs to
/// the end of the markup.
fn title_object(markup: &str) -> Option<&str> {
    let start = TITLE_COLLECTION_RE.find(markup)?.end() - 1;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in markup[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&markup[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    Some(&markup[start..])
}

fn extract_description(markup: &str, blob: Option<&str>) -> String {
    let from_blob = blob
        .and_then(|b| DESCRIPTION_RE.captures(b))
        .map(|caps| clean_html(&unescape_json_str(&caps[1])))
        .filter(|d| !d.is_empty() && !looks_like_subject_code(d));

    if let Some(description) = from_blob {
        return description;
    }

    let document = Html::parse_document(markup);
    document
        .select(&BODY_DESCRIPTION)
        .next()
        .map(|article| clean_html(&article.inner_html()))
        .unwrap_or_default()
}

fn looks_like_subject_code(text: &str) -> bool {
    text.starts_with("FICTION ") || text.starts_with("Fiction /")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CopyCounts;

    fn parser() -> OverDriveParser {
        OverDriveParser::new("westerncape.overdrive.com")
    }

    const DETAIL_PAGE: &str = r#"<html><head><script>
window.OverDrive.titleCollection = {"id":"8919230","title":"Paradise","publisher":{"id":"1","name":"Bloomsbury"},"description":"<p>Winner of the <i>Nobel Prize<\/i> &amp; more.<\/p>","availableCopies":1,"ownedCopies":2}
</script></head><body></body></html>"#;

    #[test]
    fn reads_counters_from_loose_blob() {
        let record = parser()
            .extract("8919230", "var data = { availableCopies: 1, ownedCopies: 2 };")
            .unwrap();
        assert!(record.is_available);
        assert_eq!(record.available_copies, 1);
        assert_eq!(record.total_copies, 2);
        assert!(!record.counters_clamped);
        assert_eq!(record.description, "");
        assert_eq!(record.counts(), CopyCounts { available: 1, total: 2 });
    }

    #[test]
    fn reads_full_detail_page() {
        let record = parser().extract("8919230", DETAIL_PAGE).unwrap();
        assert!(record.is_available);
        assert_eq!(record.counts().to_string(), "(1/2)");
        assert_eq!(record.title.as_deref(), Some("Paradise"));
        assert_eq!(record.description, "Winner of the Nobel Prize & more.");
        assert_eq!(record.borrow_url, "https://westerncape.overdrive.com/media/8919230");
    }

    #[test]
    fn clamps_inconsistent_counters() {
        let record = parser()
            .extract("42", r#"{"availableCopies":3,"ownedCopies":2}"#)
            .unwrap();
        assert_eq!(record.available_copies, 0);
        assert_eq!(record.total_copies, 2);
        assert!(!record.is_available);
        assert!(record.counters_clamped);
    }

    #[test]
    fn zero_owned_copies_means_unavailable() {
        let record = parser()
            .extract("42", r#"{"availableCopies":1,"ownedCopies":0}"#)
            .unwrap();
        assert_eq!(record.available_copies, 0);
        assert!(!record.is_available);
        assert!(record.counters_clamped);
    }

    #[test]
    fn checked_out_title_is_not_available() {
        let record = parser()
            .extract("7", r#"{"availableCopies":0,"ownedCopies":3}"#)
            .unwrap();
        assert!(!record.is_available);
        assert!(!record.counters_clamped);
        assert_eq!(record.counts().to_string(), "(0/3)");
    }

    #[test]
    fn missing_counters_is_a_parse_error() {
        let err = parser()
            .extract("99", "<html><body>Page not found</body></html>")
            .unwrap_err();
        assert_eq!(err, ParseError::MissingCounters { book_id: "99".into() });
    }

    #[test]
    fn availability_flag_alone_is_not_enough() {
        let err = parser()
            .extract("99", r#"{"isAvailable":true,"availableCopies":1}"#)
            .unwrap_err();
        assert_eq!(err, ParseError::MissingCounters { book_id: "99".into() });
    }

    #[test]
    fn overflowing_counter_is_rejected() {
        let err = parser()
            .extract("5", r#"{"availableCopies":99999999999,"ownedCopies":1}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidCounter { field: "availableCopies", .. }));
    }

    #[test]
    fn similarly_named_keys_are_ignored() {
        let err = parser()
            .extract("5", r#"{"estimatedavailableCopies":1,"ownedCopies":1}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::MissingCounters { .. }));
    }

    #[test]
    fn falls_back_to_body_when_blob_holds_subject_code() {
        let markup = r#"<script>window.OverDrive.titleCollection = {"publisher":{"name":"X"},"description":"FICTION / Literary","availableCopies":0,"ownedCopies":1}</script>
<article class="TitleDetailsDescription-description is-open"><p>A story about the sea &mdash; and loss.</p></article>"#;
        let record = parser().extract("3", markup).unwrap();
        assert_eq!(record.description, "A story about the sea — and loss.");
    }

    #[test]
    fn description_from_later_script_is_ignored() {
        let markup = r#"<script>window.OverDrive.titleCollection = {"id":"1","title":"Paradise","availableCopies":1,"ownedCopies":2};
window.OverDrive.relatedTitles = [{"title":"Other Book","publisher":{"name":"Y"},"description":"Some other book entirely"}];</script>"#;
        let record = parser().extract("1", markup).unwrap();
        assert_eq!(record.description, "");
        assert_eq!(record.title.as_deref(), Some("Paradise"));
    }

    #[test]
    fn title_outside_the_blob_is_not_used() {
        let markup = r#"<script>var meta = {"title":"Library Home"};
window.OverDrive.titleCollection = {"id":"1","subtitle":"A Novel","availableCopies":0,"ownedCopies":1};</script>"#;
        let record = parser().extract("1", markup).unwrap();
        assert_eq!(record.title, None);
    }

    #[test]
    fn braces_inside_description_do_not_end_the_blob() {
        let markup = r#"window.OverDrive.titleCollection = {"title":"Sets {and} Maps","publisher":{"name":"Z"},"description":"Uses \"{braces}\" freely","availableCopies":1,"ownedCopies":1};"#;
        let record = parser().extract("1", markup).unwrap();
        assert_eq!(record.title.as_deref(), Some("Sets {and} Maps"));
        assert_eq!(record.description, "Uses \"{braces}\" freely");
    }

    #[test]
    fn borrow_url_uses_catalog_host() {
        assert_eq!(
            parser().borrow_url("8919230"),
            "https://westerncape.overdrive.com/media/8919230"
        );
    }
}
