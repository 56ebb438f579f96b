// Core structs: SearchResultRecord, MatchDecision, AvailabilityRecord
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One candidate audiobook returned by a catalog search for a roster author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultRecord {
    pub searched_author: String,
    #[serde(default)]
    pub candidate_author: Option<String>,
    pub title: String,
    pub book_id: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    pub search_url: String,
    #[serde(default)]
    pub formats: Vec<String>,
    /// Availability flag shown on the search page. Informational only.
    #[serde(default)]
    pub listed_available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchRule {
    Exact,
    Containment,
    Fuzzy,
}

impl MatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchRule::Exact => "exact",
            MatchRule::Containment => "containment",
            MatchRule::Fuzzy => "fuzzy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub verdict: bool,
    pub confidence: f64,
    pub rule: MatchRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    Scored(MatchRule),
    MissingField(&'static str),
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Scored(rule) => write!(f, "{}", rule.as_str()),
            DecisionReason::MissingField(field) => write!(f, "missing {}", field),
        }
    }
}

/// Audit entry for one refinement input.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDecision {
    pub record: SearchResultRecord,
    pub keep: bool,
    pub confidence: f64,
    pub reason: DecisionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCounts {
    pub available: u32,
    pub total: u32,
}

impl fmt::Display for CopyCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}/{})", self.available, self.total)
    }
}

/// Snapshot of a title's lending state at fetch time.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub book_id: String,
    pub title: Option<String>,
    pub is_available: bool,
    pub available_copies: u32,
    pub total_copies: u32,
    pub borrow_url: String,
    pub description: String,
    pub counters_clamped: bool,
    pub fetched_at: DateTime<Utc>,
}

impl AvailabilityRecord {
    pub fn counts(&self) -> CopyCounts {
        CopyCounts {
            available: self.available_copies,
            total: self.total_copies,
        }
    }
}

/// A retained search result merged with its availability snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedBook {
    pub book: SearchResultRecord,
    pub availability: AvailabilityRecord,
}

/// Per-record outcome of a batch stage. Failures never abort the batch.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<(String, String)>,
}

impl<T> BatchOutcome<T> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("no copy counters found on page for book {book_id}")]
    MissingCounters { book_id: String },
    #[error("counter {field} out of range for book {book_id}: {value}")]
    InvalidCounter {
        book_id: String,
        field: &'static str,
        value: String,
    },
    #[error("no award table on {0} page")]
    MissingAwardTable(&'static str),
    #[error("malformed title collection: {0}")]
    TitleCollection(String),
}

/// Why checking one book failed.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster I/O error for {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse roster {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("failed to write roster {path}: {source}")]
    Encode {
        path: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
