//! Per-stream submission cache backed by SQLite.
//!
//! # Responsibility
//! - Persist resolved submissions so later runs only need new messages.
//! - Merge repeated ingestions idempotently by event id.
//!
//! # Invariants
//! - `(stream, id)` is unique; an upsert overwrites every field in place.
//! - Listing order is `timestamp ASC, id ASC`.

use super::{RepoError, RepoResult};
use crate::model::event::{EventId, SubmissionEvent};
use chrono::DateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_SELECT_SQL: &str = "SELECT
    id,
    sender_id,
    sender_name,
    sender_email,
    label,
    content,
    timestamp,
    on_time,
    valid
FROM submission_events";

/// Submission cache scoped to one class stream.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
    stream: String,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection, stream: impl Into<String>) -> Self {
        Self {
            conn,
            stream: stream.into(),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Inserts a submission or overwrites the one with the same id.
    pub fn upsert_event(&self, event: &SubmissionEvent) -> RepoResult<()> {
        event.validate()?;
        upsert_row(self.conn, &self.stream, event)
    }

    /// Upserts a batch atomically; nothing is written if any event is invalid.
    pub fn upsert_events(&self, events: &[SubmissionEvent]) -> RepoResult<usize> {
        for event in events {
            event.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        for event in events {
            upsert_row(&tx, &self.stream, event)?;
        }
        tx.commit()?;
        Ok(events.len())
    }

    pub fn get_event(&self, id: EventId) -> RepoResult<Option<SubmissionEvent>> {
        let row = self
            .conn
            .query_row(
                &format!("{EVENT_SELECT_SQL} WHERE stream = ?1 AND id = ?2;"),
                params![self.stream, id],
                StoredRow::read,
            )
            .optional()?;
        row.map(StoredRow::into_event).transpose()
    }

    /// All submissions of this stream in chronological order.
    pub fn list_events(&self) -> RepoResult<Vec<SubmissionEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL} WHERE stream = ?1 ORDER BY timestamp ASC, id ASC;"
        ))?;
        let rows = stmt
            .query_map(params![self.stream], StoredRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(StoredRow::into_event).collect()
    }

    pub fn count(&self) -> RepoResult<usize> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM submission_events WHERE stream = ?1;",
            params![self.stream],
            |row| row.get::<_, i64>(0),
        )?;
        usize::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }
}

fn upsert_row(conn: &Connection, stream: &str, event: &SubmissionEvent) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO submission_events (
            stream,
            id,
            sender_id,
            sender_name,
            sender_email,
            label,
            content,
            timestamp,
            on_time,
            valid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(stream, id) DO UPDATE SET
            sender_id = excluded.sender_id,
            sender_name = excluded.sender_name,
            sender_email = excluded.sender_email,
            label = excluded.label,
            content = excluded.content,
            timestamp = excluded.timestamp,
            on_time = excluded.on_time,
            valid = excluded.valid;",
        params![
            stream,
            event.id,
            event.sender_id,
            event.sender_name.as_str(),
            event.sender_email.as_str(),
            event.label.as_str(),
            event.content.as_str(),
            event.timestamp.timestamp(),
            event.on_time,
            event.valid,
        ],
    )?;
    Ok(())
}

/// Raw column values before domain checks.
struct StoredRow {
    id: EventId,
    sender_id: i64,
    sender_name: String,
    sender_email: String,
    label: String,
    content: String,
    timestamp: i64,
    on_time: i64,
    valid: i64,
}

impl StoredRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            sender_id: row.get("sender_id")?,
            sender_name: row.get("sender_name")?,
            sender_email: row.get("sender_email")?,
            label: row.get("label")?,
            content: row.get("content")?,
            timestamp: row.get("timestamp")?,
            on_time: row.get("on_time")?,
            valid: row.get("valid")?,
        })
    }

    fn into_event(self) -> RepoResult<SubmissionEvent> {
        let timestamp = DateTime::from_timestamp(self.timestamp, 0).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "timestamp {} out of range for event {}",
                self.timestamp, self.id
            ))
        })?;
        let event = SubmissionEvent {
            id: self.id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            sender_email: self.sender_email,
            label: self.label,
            content: self.content,
            timestamp,
            on_time: parse_flag(self.on_time, "on_time")?,
            valid: parse_flag(self.valid, "valid")?,
        };
        event.validate()?;
        Ok(event)
    }
}

fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in submission_events.{column}"
        ))),
    }
}
