//! The append-only history sink interface and its in-memory implementation.

use crate::{Record, Result, TurnId, Usage};
use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Append-only destination for conversation records.
///
/// Implementations must preserve arrival order. Records are never updated
/// or removed once appended.
pub trait HistorySink: Send {
    /// Append one record.
    fn append(&self, record: &Record) -> Result<()>;

    /// All records, in arrival order.
    fn records(&self) -> Result<Vec<Record>>;

    /// Records belonging to one exchange, in arrival order.
    fn turn(&self, turn_id: TurnId) -> Result<Vec<Record>> {
        Ok(self
            .records()?
            .into_iter()
            .filter(|r| r.turn_id == turn_id)
            .collect())
    }
}

impl<T: HistorySink + Sync> HistorySink for std::sync::Arc<T> {
    fn append(&self, record: &Record) -> Result<()> {
        (**self).append(record)
    }

    fn records(&self) -> Result<Vec<Record>> {
        (**self).records()
    }

    fn turn(&self, turn_id: TurnId) -> Result<Vec<Record>> {
        (**self).turn(turn_id)
    }
}

/// A history sink that keeps records in process memory.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<Record>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Record>> {
        // A poisoned lock still holds a consistent append-only vector.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl HistorySink for MemoryHistory {
    fn append(&self, record: &Record) -> Result<()> {
        self.lock().push(record.clone());
        Ok(())
    }

    fn records(&self) -> Result<Vec<Record>> {
        Ok(self.lock().clone())
    }
}

/// Aggregate view of one recorded exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub turn_id: TurnId,
    pub started_at: DateTime<Utc>,
    pub messages: usize,
    pub usage: Usage,
}

/// Group records by turn, keeping turns in first-seen order.
pub fn summarize(records: &[Record]) -> Vec<TurnSummary> {
    let mut summaries: Vec<TurnSummary> = Vec::new();
    for record in records {
        match summaries.iter_mut().find(|s| s.turn_id == record.turn_id) {
            Some(summary) => {
                summary.messages += 1;
                summary.usage += record.usage;
            }
            None => summaries.push(TurnSummary {
                turn_id: record.turn_id,
                started_at: record.timestamp,
                messages: 1,
                usage: record.usage,
            }),
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    #[test]
    fn memory_history_keeps_arrival_order() {
        let history = MemoryHistory::new();
        let turn = TurnId::new();
        for content in ["one", "two", "three"] {
            history
                .append(&Record::new(turn, Role::User, content, "m", Usage::default()))
                .unwrap();
        }
        let contents: Vec<_> = history
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.content)
            .collect();
        assert_eq!(contents, ["one", "two", "three"]);
    }

    #[test]
    fn turn_filters_by_identifier() {
        let history = MemoryHistory::new();
        let first = TurnId::new();
        let second = TurnId::new();
        history
            .append(&Record::new(first, Role::User, "a", "m", Usage::default()))
            .unwrap();
        history
            .append(&Record::new(second, Role::User, "b", "m", Usage::default()))
            .unwrap();
        history
            .append(&Record::new(first, Role::Assistant, "c", "m", Usage::default()))
            .unwrap();

        let turn = history.turn(first).unwrap();
        assert_eq!(turn.len(), 2);
        assert_eq!(turn[1].content, "c");
    }

    #[test]
    fn summarize_groups_in_first_seen_order() {
        let first = TurnId::new();
        let second = TurnId::new();
        let records = vec![
            Record::new(first, Role::User, "a", "m", Usage::input(3)),
            Record::new(first, Role::Assistant, "b", "m", Usage::new(10, 4)),
            Record::new(second, Role::User, "c", "m", Usage::input(1)),
        ];

        let summaries = summarize(&records);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].turn_id, first);
        assert_eq!(summaries[0].messages, 2);
        assert_eq!(summaries[0].usage, Usage::new(13, 4));
        assert_eq!(summaries[1].turn_id, second);
    }
}
