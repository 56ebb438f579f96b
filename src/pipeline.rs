// Workflow runner: scrape -> search -> refine -> availability
use crate::config::{AppConfig, Stage};
use crate::fetcher::{search_url, Fetcher};
use crate::matcher::{refine, score, Refinement};
use crate::model::{BatchOutcome, CheckError, CheckedBook, SearchResultRecord, StorageError};
use crate::parser::award::{parse_award_authors, AwardList};
use crate::parser::{OverDriveParser, SearchPage};
use crate::report;
use crate::roster;
use crate::storage::SqliteStorage;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rosters_scraped: usize,
    pub scrape_failures: usize,
    pub authors_searched: usize,
    pub search_failures: usize,
    pub results_found: usize,
    pub decisions: usize,
    pub kept: usize,
    pub books_checked: usize,
    pub books_available: usize,
    pub check_failures: usize,
}

/// Runs the configured stages. Stages that are skipped read their input from storage.
pub async fn run(
    config: &AppConfig,
    fetcher: &dyn Fetcher,
    storage: &SqliteStorage,
) -> Result<RunSummary, StorageError> {
    let parser = OverDriveParser::new(config.catalog_host.clone());
    let mut summary = RunSummary::default();

    if config.runs(Stage::Scrape) {
        let outcome = scrape_stage(&config.award_lists, fetcher, &config.roster_dir).await;
        summary.rosters_scraped = outcome.succeeded.len();
        summary.scrape_failures = outcome.failure_count();
    }

    if config.runs(Stage::Search) {
        let mut authors = roster::load_all(&config.roster_files);
        if let Some(limit) = config.limit {
            authors.truncate(limit);
        }
        let outcome = search_stage(&authors, fetcher, &parser, storage).await;
        summary.authors_searched = authors.len();
        summary.search_failures = outcome.failure_count();
        summary.results_found = outcome.succeeded.iter().map(|p| p.records.len()).sum();
    }

    if config.runs(Stage::Refine) {
        let records = storage.load_search_results()?;
        let refinement = refine_stage(&records, config.match_threshold, storage);
        summary.decisions = refinement.decisions.len();
        summary.kept = refinement.kept.len();
    }

    if config.runs(Stage::Availability) {
        let mut records = storage.load_refined()?;
        if let Some(author) = &config.author {
            records = select_author(records, author);
        }
        if let Some(limit) = config.limit {
            records.truncate(limit);
        }
        let outcome = availability_stage(
            &records,
            fetcher,
            &parser,
            config.availability_concurrency,
            storage,
        )
        .await;
        summary.books_checked = records.len();
        summary.books_available = outcome
            .succeeded
            .iter()
            .filter(|b| b.availability.is_available)
            .count();
        summary.check_failures = outcome.failure_count();
    }

    Ok(summary)
}

/// Fetches each award list and writes its roster to `roster_dir`.
/// A list that fails to download or parse keeps its previous roster file.
pub async fn scrape_stage(
    lists: &[AwardList],
    fetcher: &dyn Fetcher,
    roster_dir: &Path,
) -> BatchOutcome<PathBuf> {
    let mut outcome = BatchOutcome::new();

    for &list in lists {
        info!("Scraping {} authors from {}", list.label(), list.page_url());
        let authors = match fetcher.fetch(list.page_url()).await {
            Ok(html) => parse_award_authors(list, &html).map_err(CheckError::from),
            Err(e) => Err(CheckError::from(e)),
        };

        let authors = match authors {
            Ok(authors) if authors.is_empty() => {
                warn!("No authors found on the {} page, keeping the old roster", list.label());
                outcome.failed.push((list.label().to_string(), "no authors found".to_string()));
                continue;
            }
            Ok(authors) => authors,
            Err(e) => {
                warn!("Scrape failed for {}: {}", list.label(), e);
                outcome.failed.push((list.label().to_string(), e.to_string()));
                continue;
            }
        };

        let path = roster_dir.join(list.roster_file_name());
        match roster::save_roster(&path, &authors) {
            Ok(()) => {
                info!("  Saved {} unique authors to {}", authors.len(), path.display());
                outcome.succeeded.push(path);
            }
            Err(e) => {
                warn!("{}", e);
                outcome.failed.push((list.label().to_string(), e.to_string()));
            }
        }
    }

    outcome
}

/// Searches the catalog for every author. A failed author is recorded and skipped.
pub async fn search_stage(
    authors: &[String],
    fetcher: &dyn Fetcher,
    parser: &OverDriveParser,
    storage: &SqliteStorage,
) -> BatchOutcome<SearchPage> {
    let mut outcome = BatchOutcome::new();
    info!("Searching for audiobooks by {} authors...", authors.len());

    for (i, author) in authors.iter().enumerate() {
        info!("[{}/{}] Searching for: {}", i + 1, authors.len(), author);
        let url = search_url(parser.catalog_host(), author);

        let page = match fetcher.fetch(&url).await {
            Ok(html) => parser.parse_search(author, &url, &html).map_err(CheckError::from),
            Err(e) => Err(CheckError::from(e)),
        };

        match page {
            Ok(page) => {
                info!("  Found {} audiobooks", page.records.len());
                if let Err(e) = storage.replace_search_results(author, &page.records) {
                    warn!("DB save error for {}: {:?}", author, e);
                }
                outcome.succeeded.push(page);
            }
            Err(e) => {
                warn!("Search failed for {}: {}", author, e);
                outcome.failed.push((author.clone(), e.to_string()));
            }
        }
    }

    info!(
        "Search finished: {} ok, {} failed",
        outcome.succeeded.len(),
        outcome.failure_count()
    );
    outcome
}

/// Refines search results and persists the kept set plus the decision log.
pub fn refine_stage(records: &[SearchResultRecord], threshold: f64, storage: &SqliteStorage) -> Refinement {
    info!("Refining {} search results (threshold {:.2})...", records.len(), threshold);
    let refinement = refine(records, threshold);

    let run_at = Utc::now();
    match storage.save_decisions(run_at, &refinement.decisions) {
        Ok(()) => match storage.decision_counts(run_at) {
            Ok((kept, dropped)) => info!("Decision log: {} kept, {} dropped", kept, dropped),
            Err(e) => warn!("Failed to read back decision log: {:?}", e),
        },
        Err(e) => warn!("Failed to save decision log: {:?}", e),
    }
    if let Err(e) = storage.replace_refined(&refinement.kept) {
        warn!("Failed to save refined results: {:?}", e);
    }

    report::log_refinement_summary(&refinement);
    refinement
}

/// Checks availability of each book, `concurrency` at a time, in input order.
pub async fn availability_stage(
    records: &[SearchResultRecord],
    fetcher: &dyn Fetcher,
    parser: &OverDriveParser,
    concurrency: usize,
    storage: &SqliteStorage,
) -> BatchOutcome<CheckedBook> {
    let total = records.len();
    info!("Checking availability for {} books...", total);

    let results: Vec<(&SearchResultRecord, Result<_, CheckError>)> = stream::iter(records)
        .map(|record| async move {
            let url = parser.borrow_url(&record.book_id);
            let result = match fetcher.fetch(&url).await {
                Ok(html) => parser.extract(&record.book_id, &html).map_err(CheckError::from),
                Err(e) => Err(CheckError::from(e)),
            };
            (record, result)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = BatchOutcome::new();
    for (i, (record, result)) in results.into_iter().enumerate() {
        match result {
            Ok(availability) => {
                if availability.is_available {
                    info!(
                        "[{}/{}] {} by {}: ✓ AVAILABLE {}",
                        i + 1,
                        total,
                        record.title,
                        record.searched_author,
                        availability.counts()
                    );
                } else {
                    info!(
                        "[{}/{}] {} by {}: ✗ Not available {}",
                        i + 1,
                        total,
                        record.title,
                        record.searched_author,
                        availability.counts()
                    );
                }
                match storage.latest_snapshot(&record.book_id) {
                    Ok(Some(previous)) if previous.counts() != availability.counts() => {
                        info!(
                            "   Changed since {}: {} → {}",
                            previous.fetched_at,
                            previous.counts(),
                            availability.counts()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Previous snapshot unreadable for {}: {:?}", record.book_id, e),
                }
                if let Err(e) = storage.save_snapshot(&availability) {
                    warn!("Snapshot save error for {}: {:?}", record.book_id, e);
                }
                outcome.succeeded.push(CheckedBook {
                    book: record.clone(),
                    availability,
                });
            }
            Err(e) => {
                warn!("[{}/{}] {}: check failed: {}", i + 1, total, record.book_id, e);
                outcome.failed.push((record.book_id.clone(), e.to_string()));
            }
        }
    }

    report::log_availability_summary(&outcome.succeeded);
    if outcome.failure_count() > 0 {
        warn!("{} of {} books could not be checked", outcome.failure_count(), total);
    }
    outcome
}

/// Keeps the books searched under a name that matches `author`.
pub fn select_author(records: Vec<SearchResultRecord>, author: &str) -> Vec<SearchResultRecord> {
    let selected: Vec<SearchResultRecord> = records
        .into_iter()
        .filter(|r| score(author, &r.searched_author).verdict)
        .collect();
    if selected.is_empty() {
        warn!("No refined books for author '{}'", author);
    } else {
        info!("Checking {} book(s) by {}", selected.len(), author);
    }
    selected
}
