// Wikipedia award pages: winners and nominees become author rosters
use crate::model::ParseError;
use crate::parser::text::collapse_ws;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

static WIKITABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table.wikitable").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static DATA_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));
static ANY_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static PARENTHESES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").expect("valid regex"));
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

/// Award lists that can be turned into a roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AwardList {
    Hugo,
    Booker,
    Nobel,
}

impl AwardList {
    pub fn page_url(self) -> &'static str {
        match self {
            AwardList::Hugo => "https://en.wikipedia.org/wiki/Hugo_Award_for_Best_Novel",
            AwardList::Booker => {
                "https://en.wikipedia.org/wiki/List_of_winners_and_nominated_authors_of_the_Booker_Prize"
            }
            AwardList::Nobel => "https://en.wikipedia.org/wiki/List_of_Nobel_laureates_in_Literature",
        }
    }

    /// File the roster is written to, matching the default `roster_files`.
    pub fn roster_file_name(self) -> &'static str {
        match self {
            AwardList::Hugo => "hugo_award_authors.json",
            AwardList::Booker => "booker_prize_authors.json",
            AwardList::Nobel => "nobel_literature_authors.json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AwardList::Hugo => "Hugo Award",
            AwardList::Booker => "Booker Prize",
            AwardList::Nobel => "Nobel Prize in Literature",
        }
    }
}

/// Sorted, unique author names from an award list page.
///
/// A page with no `wikitable` at all is an error; a table with no usable
/// rows just gives an empty roster.
pub fn parse_award_authors(list: AwardList, html: &str) -> Result<Vec<String>, ParseError> {
    let document = Html::parse_document(html);
    let tables: Vec<ElementRef> = document.select(&WIKITABLE).collect();
    if tables.is_empty() {
        return Err(ParseError::MissingAwardTable(list.label()));
    }

    let raw: Vec<String> = match list {
        AwardList::Hugo => tables.iter().flat_map(|t| body_rows(*t)).filter_map(hugo_author).collect(),
        AwardList::Booker => tables.iter().flat_map(|t| body_rows(*t)).filter_map(booker_author).collect(),
        // Every laureate is in the first table; later ones are statistics.
        AwardList::Nobel => body_rows(tables[0]).filter_map(nobel_author).collect(),
    };

    let authors: BTreeSet<String> = raw.iter().filter_map(|a| clean_author(a)).collect();
    debug!(list = list.label(), rows = raw.len(), authors = authors.len(), "Parsed award page");
    Ok(authors.into_iter().collect())
}

fn body_rows(table: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    table.select(&ROW).skip(1)
}

fn cell_text(cell: &ElementRef) -> String {
    collapse_ws(&cell.text().collect::<String>())
}

// Author | Title | Publisher; winners carry an asterisk.
fn hugo_author(row: ElementRef) -> Option<String> {
    let cells: Vec<ElementRef> = row.select(&DATA_CELL).collect();
    if cells.len() < 2 || cell_text(&cells[1]).chars().count() < 2 {
        return None;
    }
    // Co-authors are separate text nodes; the first one is the main author.
    cells[0]
        .text()
        .map(|t| t.replace('*', ""))
        .map(|t| t.trim().to_string())
        .find(|t| !t.is_empty())
}

// Status | Author | Title, status being Winner, Shortlist or Longlist.
fn booker_author(row: ElementRef) -> Option<String> {
    let cells: Vec<ElementRef> = row.select(&DATA_CELL).collect();
    if cells.len() < 3 {
        return None;
    }
    let status = cell_text(&cells[0]);
    if !["Winner", "Shortlist", "Longlist"].iter().any(|s| status.contains(s)) {
        return None;
    }
    let title = PARENTHESES_RE.replace_all(&REFERENCE_RE.replace_all(&cell_text(&cells[2]), ""), "").into_owned();
    if title.trim().chars().count() < 2 {
        return None;
    }
    Some(cell_text(&cells[1]))
}

// Year | Picture | Laureate | Country | Language | Citation | Genre
fn nobel_author(row: ElementRef) -> Option<String> {
    let cells: Vec<ElementRef> = row.select(&ANY_CELL).collect();
    if cells.len() < 6 {
        return None;
    }
    let year = cell_text(&cells[0]);
    if year.contains("Not awarded") || !YEAR_RE.is_match(&year) {
        return None;
    }
    let laureate = &cells[2];
    let name = laureate
        .select(&LINK)
        .next()
        .map(|link| cell_text(&link))
        .unwrap_or_else(|| cell_text(laureate));
    Some(name)
}

/// Drops reference markers, parenthetical notes and asterisks, and keeps the
/// first of "X and Y" co-authors. Names shorter than two chars are rejected.
fn clean_author(raw: &str) -> Option<String> {
    let without_refs = REFERENCE_RE.replace_all(raw, "");
    let without_notes = PARENTHESES_RE.replace_all(&without_refs, "");
    let name = without_notes.replace('*', "");
    let primary = name.split(" and ").next().unwrap_or_default();
    let primary = collapse_ws(primary);
    (primary.chars().count() > 1).then_some(primary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hugo_takes_first_author_of_each_row() {
        let html = r#"<table class="wikitable">
<tr><th>Author(s)</th><th>Novel</th><th>Publisher</th></tr>
<tr style="background:#B0C4DE"><td>Ann Leckie*</td><td>Ancillary Justice</td><td>Orbit</td></tr>
<tr><td>Larry Niven<br/>Jerry Pournelle</td><td>The Mote in God's Eye</td><td>Simon &amp; Schuster</td></tr>
<tr><td>N. K. Jemisin<sup>[3]</sup></td><td>The Fifth Season</td><td>Orbit</td></tr>
<tr><td>Ann Leckie</td><td>Ancillary Sword</td><td>Orbit</td></tr>
<tr><td>No Title</td><td></td></tr>
</table>"#;
        let authors = parse_award_authors(AwardList::Hugo, html).unwrap();
        assert_eq!(authors, vec!["Ann Leckie", "Larry Niven", "N. K. Jemisin"]);
    }

    #[test]
    fn booker_keeps_only_listed_statuses() {
        let html = r#"<table class="wikitable">
<tr><th>Status</th><th>Author</th><th>Title</th></tr>
<tr><td>Winner</td><td>Anna Burns</td><td>Milkman</td></tr>
<tr><td>Shortlist</td><td>Richard Powers</td><td>The Overstory<sup>[12]</sup></td></tr>
<tr><td>Longlist</td><td>Sally Rooney (author)</td><td>Normal People</td></tr>
<tr><td>Judges</td><td>Kwame Anthony Appiah</td><td>-</td></tr>
<tr><td>Winner</td><td>Margaret Atwood and Bernardine Evaristo</td><td>The Testaments</td></tr>
</table>"#;
        let authors = parse_award_authors(AwardList::Booker, html).unwrap();
        assert_eq!(
            authors,
            vec!["Anna Burns", "Margaret Atwood", "Richard Powers", "Sally Rooney"]
        );
    }

    #[test]
    fn nobel_reads_first_table_and_skips_gaps() {
        let html = r#"<table class="wikitable">
<tr><th>Year</th><th>Picture</th><th>Laureate</th><th>Country</th><th>Language</th><th>Citation</th><th>Genre</th></tr>
<tr><td>2021</td><td><img src="g.jpg"/></td><th><a href="/wiki/Abdulrazak_Gurnah">Abdulrazak Gurnah</a> (born 1948)</th><td>Tanzania</td><td>English</td><td>"for his uncompromising..."</td><td>novel</td></tr>
<tr><td>1943</td><td colspan="6">Not awarded</td></tr>
<tr><td>1940 Not awarded</td><td></td><td>-</td><td>-</td><td>-</td><td>-</td></tr>
<tr><td>1913</td><td></td><td>Rabindranath Tagore</td><td>India</td><td>Bengali</td><td>"because of..."</td></tr>
</table>
<table class="wikitable"><tr><th>Stats</th></tr><tr><td>2000</td><td></td><td><a>Not A Laureate</a></td><td></td><td></td><td></td></tr></table>"#;
        let authors = parse_award_authors(AwardList::Nobel, html).unwrap();
        assert_eq!(authors, vec!["Abdulrazak Gurnah", "Rabindranath Tagore"]);
    }

    #[test]
    fn page_without_table_is_an_error() {
        let err = parse_award_authors(AwardList::Booker, "<html><body>Rate limited</body></html>").unwrap_err();
        assert_eq!(err, ParseError::MissingAwardTable("Booker Prize"));
    }

    #[test]
    fn cleans_author_noise() {
        assert_eq!(clean_author("Ursula K. Le Guin[4]").as_deref(), Some("Ursula K. Le Guin"));
        assert_eq!(clean_author("Shehan Karunatilaka (writer)").as_deref(), Some("Shehan Karunatilaka"));
        assert_eq!(clean_author("X"), None);
    }

    #[test]
    fn roster_files_match_default_rosters() {
        assert_eq!(AwardList::Booker.roster_file_name(), "booker_prize_authors.json");
        assert!(AwardList::Nobel.page_url().starts_with("https://en.wikipedia.org/wiki/"));
    }
}
