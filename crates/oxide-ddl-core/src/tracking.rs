//! Migration tracking.
//!
//! Applied migrations are recorded in the `_oxide_ddl_migrations` table:
//! one row per migration holding its name, the checksum of the applied
//! SQL, the batch it ran in and when it was applied. This module renders
//! that table's DDL and the statements that maintain it, and keeps an
//! in-memory view of the rows for deciding what to run next.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use oxide_ddl_core::tracking::{MigrationHistory, MigrationRecord};
//!
//! let mut history = MigrationHistory::new();
//! let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
//! history.record(MigrationRecord::new("0001_initial", "ab12", history.next_batch(), at));
//!
//! assert!(history.is_applied("0001_initial"));
//! assert!(history.checksum_mismatch("0001_initial", "ffff"));
//! assert_eq!(history.next_batch(), 2);
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::{Dialect, DialectFamily};
use crate::diff::MigrationPlan;
use crate::generate::{quote_literal, GeneratedStatement, Operation, StatementKind};

/// Name of the tracking table.
pub const TRACKING_TABLE: &str = "_oxide_ddl_migrations";

/// Tracking table DDL for the PostgreSQL family.
pub const POSTGRES_TRACKING_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS _oxide_ddl_migrations (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    checksum TEXT NOT NULL,
    batch INTEGER NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// Tracking table DDL for the SQLite family.
pub const SQLITE_TRACKING_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS _oxide_ddl_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    checksum TEXT NOT NULL,
    batch INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

/// SQL for listing applied migrations in application order.
pub const LIST_RECORDS_SQL: &str =
    "SELECT name, checksum, batch, applied_at FROM _oxide_ddl_migrations ORDER BY id";

/// The DDL creating the tracking table on `dialect`.
#[must_use]
pub fn create_tracking_table(dialect: Dialect) -> GeneratedStatement {
    let sql = match dialect.family() {
        DialectFamily::Postgres => POSTGRES_TRACKING_TABLE_SQL,
        DialectFamily::Sqlite => SQLITE_TRACKING_TABLE_SQL,
    };
    GeneratedStatement::new(StatementKind::Create, Operation::CreateTable, sql).affecting(TRACKING_TABLE)
}

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Migration name.
    pub name: String,
    /// SHA-256 of the applied SQL, hex encoded.
    pub checksum: String,
    /// Batch the migration ran in, starting at 1.
    pub batch: u32,
    /// When the migration was applied.
    pub applied_at: DateTime<Utc>,
}

impl MigrationRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        checksum: impl Into<String>,
        batch: u32,
        applied_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            checksum: checksum.into(),
            batch,
            applied_at,
        }
    }

    /// Creates the record for applying `plan` now.
    #[must_use]
    pub fn for_plan(name: impl Into<String>, plan: &MigrationPlan, batch: u32) -> Self {
        Self::new(name, plan.checksum(), batch, Utc::now())
    }
}

/// Parses an `applied_at` value as stored by either family: RFC 3339 or
/// SQLite's `CURRENT_TIMESTAMP` form (`2026-01-02 03:04:05`, UTC).
#[must_use]
pub fn parse_applied_at(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// The INSERT recording `record` on `dialect`.
#[must_use]
pub fn insert_record_sql(record: &MigrationRecord, dialect: Dialect) -> String {
    let applied_at = match dialect.family() {
        DialectFamily::Postgres => record.applied_at.format("%Y-%m-%d %H:%M:%S%:z"),
        DialectFamily::Sqlite => record.applied_at.format("%Y-%m-%d %H:%M:%S"),
    };
    format!(
        "INSERT INTO {TRACKING_TABLE} (name, checksum, batch, applied_at) VALUES ({}, {}, {}, {})",
        quote_literal(&record.name),
        quote_literal(&record.checksum),
        record.batch,
        quote_literal(&applied_at.to_string())
    )
}

/// The DELETE removing the record of `name` (for rollback).
#[must_use]
pub fn delete_record_sql(name: &str) -> String {
    format!("DELETE FROM {TRACKING_TABLE} WHERE name = {}", quote_literal(name))
}

/// The batch number for the next run.
#[must_use]
pub fn next_batch(records: &[MigrationRecord]) -> u32 {
    records.iter().map(|r| r.batch).max().unwrap_or(0) + 1
}

/// In-memory view of the tracking table.
#[derive(Debug, Clone, Default)]
pub struct MigrationHistory {
    records: Vec<MigrationRecord>,
}

impl MigrationHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history from rows loaded with [`LIST_RECORDS_SQL`].
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = MigrationRecord>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }

    /// Whether `name` has been applied.
    #[must_use]
    pub fn is_applied(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The record of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MigrationRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Whether `name` was applied with different SQL than `checksum`.
    #[must_use]
    pub fn checksum_mismatch(&self, name: &str, checksum: &str) -> bool {
        self.get(name).is_some_and(|r| r.checksum != checksum)
    }

    /// Adds an applied migration.
    pub fn record(&mut self, record: MigrationRecord) {
        self.records.push(record);
    }

    /// Removes the record of `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<MigrationRecord> {
        let index = self.records.iter().position(|r| r.name == name)?;
        Some(self.records.remove(index))
    }

    /// The batch number for the next run.
    #[must_use]
    pub fn next_batch(&self) -> u32 {
        next_batch(&self.records)
    }

    /// Records of the most recent batch, newest first.
    #[must_use]
    pub fn last_batch(&self) -> Vec<&MigrationRecord> {
        let Some(batch) = self.records.iter().map(|r| r.batch).max() else {
            return Vec::new();
        };
        self.records.iter().rev().filter(|r| r.batch == batch).collect()
    }

    /// All records in application order.
    #[must_use]
    pub fn records(&self) -> &[MigrationRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, 30, 0).unwrap()
    }

    #[test]
    fn tracking_table_per_family() {
        let pg = create_tracking_table(Dialect::CockroachDb);
        assert!(pg.sql.contains("BIGSERIAL PRIMARY KEY"));
        assert!(pg.sql.contains("TIMESTAMPTZ"));
        assert_eq!(pg.affected, vec![TRACKING_TABLE]);
        assert!(!pg.destructive);

        let d1 = create_tracking_table(Dialect::D1);
        assert!(d1.sql.contains("INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(d1.sql.starts_with("CREATE TABLE IF NOT EXISTS _oxide_ddl_migrations"));
    }

    #[test]
    fn insert_renders_timestamps_per_family() {
        let record = MigrationRecord::new("0001_o'brien", "abc", 3, at(9));
        assert_eq!(
            insert_record_sql(&record, Dialect::Postgres),
            "INSERT INTO _oxide_ddl_migrations (name, checksum, batch, applied_at) \
             VALUES ('0001_o''brien', 'abc', 3, '2026-03-01 09:30:00+00:00')"
        );
        assert_eq!(
            insert_record_sql(&record, Dialect::Sqlite),
            "INSERT INTO _oxide_ddl_migrations (name, checksum, batch, applied_at) \
             VALUES ('0001_o''brien', 'abc', 3, '2026-03-01 09:30:00')"
        );
        assert_eq!(
            delete_record_sql("0001"),
            "DELETE FROM _oxide_ddl_migrations WHERE name = '0001'"
        );
    }

    #[test]
    fn applied_at_parses_both_formats() {
        assert_eq!(parse_applied_at("2026-03-01 09:30:00"), Some(at(9)));
        assert_eq!(parse_applied_at("2026-03-01T09:30:00Z"), Some(at(9)));
        assert_eq!(parse_applied_at("2026-03-01 11:30:00+02:00"), Some(at(9)));
        assert_eq!(parse_applied_at("yesterday"), None);
    }

    #[test]
    fn batches_increase() {
        assert_eq!(next_batch(&[]), 1);
        let mut history = MigrationHistory::from_records(vec![
            MigrationRecord::new("0001", "a", 1, at(1)),
            MigrationRecord::new("0002", "b", 2, at(2)),
            MigrationRecord::new("0003", "c", 2, at(3)),
        ]);
        assert_eq!(history.next_batch(), 3);
        let last: Vec<&str> = history.last_batch().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(last, vec!["0003", "0002"]);

        assert!(history.remove("0003").is_some());
        assert!(!history.is_applied("0003"));
        assert!(history.remove("0003").is_none());
        assert_eq!(history.records().len(), 2);
    }

    #[test]
    fn checksums_are_compared() {
        let plan = MigrationPlan::default();
        let record = MigrationRecord::for_plan("0001", &plan, 1);
        assert_eq!(record.checksum, plan.checksum());
        let history = MigrationHistory::from_records([record]);
        assert!(!history.checksum_mismatch("0001", &plan.checksum()));
        assert!(history.checksum_mismatch("0001", "other"));
        assert!(!history.checksum_mismatch("0002", "other"));
    }
}
