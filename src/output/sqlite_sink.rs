//! SQLite report sink
//!
//! Each crawl is stored as a row in `runs` (with the config hash it ran
//! under) and its pages in `crawl_log`, so several runs can share a database.

use crate::output::report::ReportEntry;
use crate::output::traits::{OutputResult, ReportSink};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    page_count INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS crawl_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    position INTEGER NOT NULL,
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    fetched_at TEXT,
    size INTEGER,
    response_code INTEGER,
    depth INTEGER NOT NULL,
    priority REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_log_run ON crawl_log(run_id);
CREATE INDEX IF NOT EXISTS idx_crawl_log_domain ON crawl_log(domain);
";

/// Stores the report in a SQLite database
pub struct SqliteReportSink {
    path: PathBuf,
    config_hash: String,
}

impl SqliteReportSink {
    /// # Arguments
    ///
    /// * `path` - Database file, created if missing
    /// * `config_hash` - Hash of the configuration the crawl ran with
    pub fn new(path: impl Into<PathBuf>, config_hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            config_hash: config_hash.into(),
        }
    }

    fn open(&self) -> OutputResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }
}

impl ReportSink for SqliteReportSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write_report(&self, entries: &[ReportEntry]) -> OutputResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO runs (finished_at, config_hash, page_count) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), self.config_hash, entries.len() as i64],
        )?;
        let run_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO crawl_log
                    (run_id, position, url, domain, fetched_at, size, response_code, depth, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    position as i64,
                    entry.url,
                    entry.domain,
                    entry.timestamp.map(|t| t.to_rfc3339()),
                    entry.size.map(|s| s as i64),
                    entry.response_code,
                    entry.depth,
                    entry.priority,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(run_id, pages = entries.len(), "Stored crawl report");
        Ok(())
    }
}

/// Loads the entries of the most recent run stored in a database
///
/// # Returns
///
/// * `Ok(Some((config_hash, entries)))` - The latest run
/// * `Ok(None)` - The database holds no runs
/// * `Err(OutputError)` - The database could not be read
pub fn load_latest_report(path: &Path) -> OutputResult<Option<(String, Vec<ReportEntry>)>> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;

    let latest: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, config_hash FROM runs ORDER BY id DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((run_id, config_hash)) = latest else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT url, fetched_at, size, response_code, depth, priority, domain
         FROM crawl_log WHERE run_id = ?1 ORDER BY position",
    )?;
    let entries = stmt
        .query_map(params![run_id], |row| {
            let fetched_at: Option<String> = row.get(1)?;
            let size: Option<i64> = row.get(2)?;
            Ok(ReportEntry {
                url: row.get(0)?,
                timestamp: fetched_at
                    .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
                    .map(|t| t.with_timezone(&Utc)),
                size: size.map(|s| s as u64),
                response_code: row.get(3)?,
                depth: row.get(4)?,
                priority: row.get(5)?,
                domain: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some((config_hash, entries)))
}
