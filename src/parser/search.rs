// Search results page: one record per entry of the inline title collection
use crate::model::{ParseError, SearchResultRecord};
use crate::parser::OverDriveParser;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

static TITLE_COLLECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)window\.OverDrive\.titleCollection\s*=\s*(\[.*?\]);").expect("valid regex")
});
static RESULT_COUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Showing\s+\d+-\d+\s+of\s+(\d+)\s+results?").expect("valid regex")
});

static SEARCH_HEADING: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1.search-text").expect("valid selector"));

const PREFERRED_COVER: &str = "cover300Wide";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage {
    /// Result count as the catalog reports it.
    pub reported_count: usize,
    pub records: Vec<SearchResultRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitleEntry {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    first_creator_name: Option<String>,
    #[serde(default)]
    is_available: bool,
    #[serde(default)]
    formats: Vec<FormatEntry>,
    #[serde(default)]
    covers: BTreeMap<String, CoverEntry>,
}

#[derive(Debug, Deserialize)]
struct FormatEntry {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct CoverEntry {
    href: Option<String>,
}

impl OverDriveParser {
    /// Parses a search results page for `searched_author`.
    /// A page without a title collection has no results; a malformed one is an error.
    pub fn parse_search(
        &self,
        searched_author: &str,
        search_url: &str,
        html: &str,
    ) -> Result<SearchPage, ParseError> {
        let mut reported_count = heading_count(html);

        let mut records = Vec::new();
        if let Some(caps) = TITLE_COLLECTION_RE.captures(html) {
            let entries: Vec<TitleEntry> = serde_json::from_str(&caps[1])
                .map_err(|e| ParseError::TitleCollection(e.to_string()))?;
            reported_count = entries.len();

            for entry in entries {
                let book_id = match &entry.id {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => String::new(),
                };
                let cover_image = entry
                    .covers
                    .get(PREFERRED_COVER)
                    .or_else(|| entry.covers.values().next())
                    .and_then(|c| c.href.clone());

                records.push(SearchResultRecord {
                    searched_author: searched_author.to_string(),
                    candidate_author: entry.first_creator_name,
                    title: entry.title.unwrap_or_else(|| "Unknown".to_string()),
                    book_id,
                    cover_image,
                    search_url: search_url.to_string(),
                    formats: entry.formats.into_iter().map(|f| f.name).collect(),
                    listed_available: entry.is_available,
                });
            }
        }

        Ok(SearchPage {
            reported_count,
            records,
        })
    }
}

fn heading_count(html: &str) -> usize {
    let document = Html::parse_document(html);
    document
        .select(&SEARCH_HEADING)
        .next()
        .map(|h| h.text().collect::<String>())
        .and_then(|text| {
            RESULT_COUNT_RE
                .captures(&text)
                .and_then(|caps| caps[1].parse::<usize>().ok())
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_URL: &str = "https://westerncape.overdrive.com/search?query=Abdulrazak%20Gurnah";

    fn parser() -> OverDriveParser {
        OverDriveParser::new("westerncape.overdrive.com")
    }

    #[test]
    fn parses_title_collection_entries() {
        let html = r#"<html><body>
<h1 class="search-text">Showing 1-2 of 2 results</h1>
<script>
window.OverDrive.titleCollection = [
  {"id":"8919230","title":"Paradise","firstCreatorName":"Abdulrazak Gurnah","isAvailable":true,
   "formats":[{"id":"audiobook-overdrive","name":"OverDrive Listen audiobook"}],
   "covers":{"cover150Wide":{"href":"https://img/150.jpg"},"cover300Wide":{"href":"https://img/300.jpg"}}},
  {"id":5551234,"title":"Afterlives","isAvailable":false}
];
</script></body></html>"#;

        let page = parser().parse_search("Abdulrazak Gurnah", SEARCH_URL, html).unwrap();
        assert_eq!(page.reported_count, 2);
        assert_eq!(page.records.len(), 2);

        let first = &page.records[0];
        assert_eq!(first.book_id, "8919230");
        assert_eq!(first.candidate_author.as_deref(), Some("Abdulrazak Gurnah"));
        assert_eq!(first.cover_image.as_deref(), Some("https://img/300.jpg"));
        assert_eq!(first.formats, vec!["OverDrive Listen audiobook".to_string()]);
        assert!(first.listed_available);
        assert_eq!(first.search_url, SEARCH_URL);

        let second = &page.records[1];
        assert_eq!(second.book_id, "5551234");
        assert_eq!(second.candidate_author, None);
        assert_eq!(second.cover_image, None);
    }

    #[test]
    fn heading_count_without_collection() {
        let html = r#"<h1 class="search-text">Showing 1-20 of 57 results</h1>"#;
        let page = parser().parse_search("Ben Okri", SEARCH_URL, html).unwrap();
        assert_eq!(page.reported_count, 57);
        assert!(page.records.is_empty());
    }

    #[test]
    fn empty_page_has_no_results() {
        let page = parser().parse_search("Nobody", SEARCH_URL, "<html></html>").unwrap();
        assert_eq!(page.reported_count, 0);
        assert!(page.records.is_empty());
    }

    #[test]
    fn malformed_collection_is_an_error() {
        let html = "<script>window.OverDrive.titleCollection = [{\"id\": ];</script>";
        let err = parser().parse_search("Nobody", SEARCH_URL, html).unwrap_err();
        assert!(matches!(err, ParseError::TitleCollection(_)));
    }
}
