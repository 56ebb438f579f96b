use crate::model::{AvailabilityRecord, MatchDecision, SearchResultRecord, StorageError};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

const RECORD_COLUMNS: &str =
    "searched_author, candidate_author, title, book_id, cover_image, search_url, formats, listed_available";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens the database and creates missing tables. `":memory:"` gives a throwaway store.
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path)?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS search_results (
                searched_author TEXT NOT NULL,
                candidate_author TEXT,
                title TEXT NOT NULL,
                book_id TEXT NOT NULL,
                cover_image TEXT,
                search_url TEXT NOT NULL,
                formats TEXT NOT NULL DEFAULT '[]',
                listed_available INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (searched_author, book_id)
            );

            CREATE TABLE IF NOT EXISTS refined_results (
                searched_author TEXT NOT NULL,
                candidate_author TEXT,
                title TEXT NOT NULL,
                book_id TEXT NOT NULL,
                cover_image TEXT,
                search_url TEXT NOT NULL,
                formats TEXT NOT NULL DEFAULT '[]',
                listed_available INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (searched_author, book_id)
            );

            CREATE TABLE IF NOT EXISTS match_decisions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_at TEXT NOT NULL,
                searched_author TEXT NOT NULL,
                candidate_author TEXT,
                title TEXT NOT NULL,
                book_id TEXT NOT NULL,
                keep INTEGER NOT NULL,
                confidence REAL NOT NULL,
                reason TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS availability_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id TEXT NOT NULL,
                title TEXT,
                is_available INTEGER NOT NULL,
                available_copies INTEGER NOT NULL,
                total_copies INTEGER NOT NULL,
                borrow_url TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                counters_clamped INTEGER NOT NULL DEFAULT 0,
                fetched_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self { conn })
    }

    /// Replaces the stored search results of one author.
    pub fn replace_search_results(
        &self,
        searched_author: &str,
        records: &[SearchResultRecord],
    ) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM search_results WHERE searched_author = ?1",
            params![searched_author],
        )?;
        for record in records {
            Self::insert_record(&tx, "search_results", record)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// All search results in insertion order.
    pub fn load_search_results(&self) -> Result<Vec<SearchResultRecord>, StorageError> {
        self.load_records("search_results")
    }

    /// Overwrites the refined set with the latest refinement output.
    pub fn replace_refined(&self, records: &[SearchResultRecord]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM refined_results", [])?;
        for record in records {
            Self::insert_record(&tx, "refined_results", record)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_refined(&self) -> Result<Vec<SearchResultRecord>, StorageError> {
        self.load_records("refined_results")
    }

    /// Appends a run's decision log.
    pub fn save_decisions(&self, run_at: DateTime<Utc>, decisions: &[MatchDecision]) -> Result<(), StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO match_decisions (
                    run_at, searched_author, candidate_author, title, book_id, keep, confidence, reason
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for decision in decisions {
                let record = &decision.record;
                stmt.execute(params![
                    run_at.to_rfc3339(),
                    &record.searched_author,
                    &record.candidate_author,
                    &record.title,
                    &record.book_id,
                    decision.keep,
                    decision.confidence,
                    decision.reason.to_string(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Number of decisions stored for a run, split into (kept, dropped).
    pub fn decision_counts(&self, run_at: DateTime<Utc>) -> Result<(usize, usize), StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT COALESCE(SUM(keep), 0), COUNT(*) - COALESCE(SUM(keep), 0)
             FROM match_decisions WHERE run_at = ?1",
        )?;
        let counts = stmt.query_row(params![run_at.to_rfc3339()], |row| {
            Ok((row.get::<_, i64>(0)? as usize, row.get::<_, i64>(1)? as usize))
        })?;
        Ok(counts)
    }

    pub fn save_snapshot(&self, record: &AvailabilityRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO availability_snapshots (
                book_id, title, is_available, available_copies, total_copies,
                borrow_url, fetched_at, description, counters_clamped
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &record.book_id,
                &record.title,
                record.is_available,
                record.available_copies,
                record.total_copies,
                &record.borrow_url,
                record.fetched_at.to_rfc3339(),
                &record.description,
                record.counters_clamped,
            ],
        )?;
        Ok(())
    }

    /// Most recent snapshot of a book, if it was ever checked.
    pub fn latest_snapshot(&self, book_id: &str) -> Result<Option<AvailabilityRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT book_id, title, is_available, available_copies, total_copies,
                    borrow_url, fetched_at, description, counters_clamped
             FROM availability_snapshots WHERE book_id = ?1
             ORDER BY id DESC LIMIT 1",
        )?;

        let mut rows = stmt.query(params![book_id])?;
        if let Some(row) = rows.next()? {
            let fetched_at_str: String = row.get(6)?;
            let fetched_at: DateTime<Utc> = fetched_at_str.parse()?;
            Ok(Some(AvailabilityRecord {
                book_id: row.get(0)?,
                title: row.get(1)?,
                is_available: row.get(2)?,
                available_copies: row.get(3)?,
                total_copies: row.get(4)?,
                borrow_url: row.get(5)?,
                description: row.get(7)?,
                counters_clamped: row.get(8)?,
                fetched_at,
            }))
        } else {
            Ok(None)
        }
    }

    fn insert_record(conn: &Connection, table: &str, record: &SearchResultRecord) -> Result<(), StorageError> {
        let formats = serde_json::to_string(&record.formats).unwrap_or_else(|_| "[]".to_string());
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                table, RECORD_COLUMNS
            ),
            params![
                &record.searched_author,
                &record.candidate_author,
                &record.title,
                &record.book_id,
                &record.cover_image,
                &record.search_url,
                formats,
                record.listed_available,
            ],
        )?;
        Ok(())
    }

    fn load_records(&self, table: &str) -> Result<Vec<SearchResultRecord>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM {} ORDER BY rowid", RECORD_COLUMNS, table))?;
        let rows = stmt.query_map([], Self::map_record)?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    fn map_record(row: &Row) -> Result<SearchResultRecord, rusqlite::Error> {
        let formats_json: String = row.get(6)?;
        let formats: Vec<String> = serde_json::from_str(&formats_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(SearchResultRecord {
            searched_author: row.get(0)?,
            candidate_author: row.get(1)?,
            title: row.get(2)?,
            book_id: row.get(3)?,
            cover_image: row.get(4)?,
            search_url: row.get(5)?,
            formats,
            listed_available: row.get(7)?,
        })
    }
}
