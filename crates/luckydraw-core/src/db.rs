// SQLite persistence: durable session keys and fallback draw outcomes.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

/// A draw result that was announced locally because the commit call failed.
/// Kept so it can be reconciled against the server's record later.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackRecord {
    pub id: i64,
    pub winner_number: u64,
    pub reason: String,
    pub recorded_at: String,
}

/// SQLite-backed key-value session storage plus the fallback outcome log.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS session_store (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS fallback_outcomes (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                winner_number INTEGER NOT NULL,
                reason        TEXT NOT NULL,
                recorded_at   TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock).
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO session_store (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .with_context(|| format!("failed to store session key {key}"))?;
        Ok(())
    }

    /// Load the value stored under `key`, if any.
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT value FROM session_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed to load session key {key}"))
    }

    /// Remove every listed key in a single transaction.
    pub fn remove_values(&self, keys: &[&str]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        for key in keys {
            tx.execute("DELETE FROM session_store WHERE key = ?1", params![key])
                .with_context(|| format!("failed to remove session key {key}"))?;
        }
        tx.commit().context("failed to commit session key removal")?;
        Ok(())
    }

    /// Append a fallback outcome, stamped with the current UTC time.
    pub fn record_fallback(&self, winner_number: u64, reason: &str) -> Result<i64> {
        let stored = i64::try_from(winner_number)
            .with_context(|| format!("winner number {winner_number} does not fit in sqlite"))?;
        let conn = self.conn();
        let recorded_at = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO fallback_outcomes (winner_number, reason, recorded_at)
             VALUES (?1, ?2, ?3)",
            params![stored, reason, recorded_at],
        )
        .context("failed to record fallback outcome")?;
        Ok(conn.last_insert_rowid())
    }

    /// All fallback outcomes, oldest first.
    pub fn load_fallbacks(&self) -> Result<Vec<FallbackRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id, winner_number, reason, recorded_at
                 FROM fallback_outcomes ORDER BY id",
            )
            .context("failed to prepare load_fallbacks query")?;

        let records = stmt
            .query_map([], |row| {
                let number: i64 = row.get(1)?;
                let winner_number = u64::try_from(number).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, Type::Integer, Box::new(e))
                })?;
                Ok(FallbackRecord {
                    id: row.get(0)?,
                    winner_number,
                    reason: row.get(2)?,
                    recorded_at: row.get(3)?,
                })
            })
            .context("failed to query fallback outcomes")?
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read fallback outcome row")?;

        Ok(records)
    }
}
