// Author rosters produced by the award scrapers
use crate::model::RosterError;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

/// Reads one roster file. Accepts a list of names, or a list of objects
/// with an `author` field (nominee and episode dumps). Anything else is empty.
pub fn load_roster(path: &Path) -> Result<Vec<String>, RosterError> {
    let content = fs::read_to_string(path).map_err(|source| RosterError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let data: Value = serde_json::from_str(&content).map_err(|source| RosterError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Ok(authors_from_value(&data))
}

fn authors_from_value(data: &Value) -> Vec<String> {
    let Some(entries) = data.as_array() else {
        return Vec::new();
    };

    match entries.first() {
        Some(Value::String(_)) => entries
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::Object(_)) => entries
            .iter()
            .filter_map(|v| v.get("author").and_then(Value::as_str))
            .filter(|a| !a.trim().is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Writes a roster as a pretty-printed list of names, creating parent directories.
pub fn save_roster(path: &Path, authors: &[String]) -> Result<(), RosterError> {
    let io_error = |source| RosterError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    serde_json::to_writer_pretty(BufWriter::new(file), authors).map_err(|source| RosterError::Encode {
        path: path.display().to_string(),
        source,
    })
}

/// Loads every roster, skipping unreadable files, and merges them.
pub fn load_all(paths: &[impl AsRef<Path>]) -> Vec<String> {
    let mut authors = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match load_roster(path) {
            Ok(list) => {
                info!("Loaded {} authors from {}", list.len(), path.display());
                authors.extend(list);
            }
            Err(e) => warn!("Skipping roster: {}", e),
        }
    }
    dedup_roster(authors)
}

/// Case-insensitive de-duplication keeping the first spelling and order.
pub fn dedup_roster(authors: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    authors
        .into_iter()
        .filter(|a| seen.insert(a.to_lowercase()))
        .collect()
}
