//! SQLite history sink.

use crate::{Error, HistorySink, Record, Result, Role, TurnId, Usage};
use rusqlite::{Connection, params};
use serde::Deserialize;
use std::path::Path;

/// SQLite-backed history sink.
pub struct SqliteHistory {
    conn: Connection,
}

/// Raw column layout of the `records` table.
#[derive(Debug, Deserialize)]
struct RecordRow {
    id: String,
    turn_id: String,
    role: String,
    content: String,
    timestamp: String,
    model: String,
    input_tokens: u32,
    output_tokens: u32,
}

impl TryFrom<RecordRow> for Record {
    type Error = Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        Ok(Record {
            id: row
                .id
                .parse()
                .map_err(|e| Error::Corrupt(format!("record id {}: {e}", row.id)))?,
            turn_id: row
                .turn_id
                .parse()
                .map_err(|e| Error::Corrupt(format!("turn id {}: {e}", row.turn_id)))?,
            role: row.role.parse::<Role>()?,
            content: row.content,
            timestamp: row
                .timestamp
                .parse()
                .map_err(|e| Error::Corrupt(format!("timestamp {}: {e}", row.timestamp)))?,
            model: row.model,
            usage: Usage::new(row.input_tokens, row.output_tokens),
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, turn_id, role, content, timestamp, model, input_tokens, output_tokens FROM records";

impl SqliteHistory {
    /// Open or create a history database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory history database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                turn_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                model TEXT NOT NULL,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_records_turn
                ON records(turn_id, seq);
            "#,
        )?;
        Ok(())
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = serde_rusqlite::from_rows::<RecordRow>(stmt.query(params)?);
        rows.map(|row| Record::try_from(row?)).collect()
    }
}

impl HistorySink for SqliteHistory {
    fn append(&self, record: &Record) -> Result<()> {
        self.conn.execute(
            "INSERT INTO records (id, turn_id, role, content, timestamp, model, input_tokens, output_tokens)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id.to_string(),
                record.turn_id.to_string(),
                record.role.as_str(),
                record.content,
                record.timestamp.to_rfc3339(),
                record.model,
                record.usage.input_tokens,
                record.usage.output_tokens,
            ],
        )?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<Record>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY seq"), [])
    }

    fn turn(&self, turn_id: TurnId) -> Result<Vec<Record>> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE turn_id = ?1 ORDER BY seq"),
            [turn_id.to_string()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_and_reads_back_in_order() {
        let store = SqliteHistory::in_memory().unwrap();
        let turn = TurnId::new();
        let user = Record::new(turn, Role::User, "list files", "m", Usage::input(2));
        let reply = Record::new(turn, Role::Assistant, "done", "m", Usage::new(40, 3));
        store.append(&user).unwrap();
        store.append(&reply).unwrap();

        let records = store.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, user.id);
        assert_eq!(records[1].role, Role::Assistant);
        assert_eq!(records[1].usage, Usage::new(40, 3));
    }

    #[test]
    fn turn_query_uses_index_column() {
        let store = SqliteHistory::in_memory().unwrap();
        let first = TurnId::new();
        let second = TurnId::new();
        store
            .append(&Record::new(first, Role::User, "a", "m", Usage::default()))
            .unwrap();
        store
            .append(&Record::new(second, Role::User, "b", "m", Usage::default()))
            .unwrap();

        let records = store.turn(second).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, "b");
    }

    #[test]
    fn reopening_file_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let turn = TurnId::new();
        {
            let store = SqliteHistory::open(&path).unwrap();
            store
                .append(&Record::new(turn, Role::User, "persisted", "m", Usage::default()))
                .unwrap();
        }
        let store = SqliteHistory::open(&path).unwrap();
        assert_eq!(store.turn(turn).unwrap()[0].content, "persisted");
    }
}
