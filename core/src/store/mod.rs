//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The calculator never touches SQL; it is handed a `ReferenceData`
//! and a `UserPortfolio` that the store assembled.

mod catalog;
mod runs;
mod user;

pub use runs::CalculationRun;
pub use user::UserCardSettings;

use crate::error::CalcResult;
use rusqlite::Connection;
use serde::{de::DeserializeOwned, Serialize};

pub struct RewardsStore {
    conn: Connection,
}

impl RewardsStore {
    pub fn open(path: &str) -> CalcResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> CalcResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to call twice.
    pub fn migrate(&self) -> CalcResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_catalog.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_user_data.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_calculation_runs.sql"))?;
        Ok(())
    }
}

// ── Column codecs ──────────────────────────────────────────────────
//
// Enum columns hold the same snake_case names the JSON files use.

fn enum_to_sql<T: Serialize>(value: &T) -> CalcResult<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(crate::error::CalcError::InvalidInput {
            reason: format!("expected a unit enum, got {other}"),
        }),
    }
}

fn enum_from_sql<T: DeserializeOwned>(idx: usize, raw: String) -> rusqlite::Result<T> {
    serde_json::from_value(serde_json::Value::String(raw)).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn json_from_sql<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn bool_to_sql(flag: bool) -> i64 {
    if flag { 1 } else { 0 }
}
