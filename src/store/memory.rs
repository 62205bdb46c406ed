use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Query, Record, RecordId, Store, StoreError};

/// An insert rejection armed on a column value, used to simulate per-row
/// store failures.
#[derive(Debug, Clone)]
struct Rejection {
    table: String,
    column: String,
    value: String,
    message: String,
}

/// In-process table store with optional uniqueness constraints.
///
/// Rows keep insertion order, which is also the order `query_range` windows
/// walk. Failure injection (offline mode, armed rejections, write latency)
/// lets callers exercise the engine's error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    unique: HashMap<String, Vec<Vec<String>>>,
    rejections: Mutex<Vec<Rejection>>,
    offline: AtomicBool,
    write_delay: Duration,
    insert_calls: AtomicUsize,
    query_calls: AtomicUsize,
    range_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a uniqueness constraint over `columns` of `table`.
    pub fn with_unique(mut self, table: &str, columns: &[&str]) -> Self {
        self.unique
            .entry(table.to_string())
            .or_default()
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Every insert waits `delay` before touching the table.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    /// Appends rows without constraint checks or call counting.
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Record>) {
        let mut tables = self.tables.lock().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Makes inserts into `table` whose `column` equals `value` fail with
    /// `message`.
    pub async fn reject_inserts(&self, table: &str, column: &str, value: &str, message: &str) {
        self.rejections.lock().await.push(Rejection {
            table: table.to_string(),
            column: column.to_string(),
            value: value.to_string(),
            message: message.to_string(),
        });
    }

    pub async fn clear_rejections(&self) {
        self.rejections.lock().await.clear();
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    async fn insert(&self, table: &str, mut record: Record) -> Result<RecordId, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }

        {
            let rejections = self.rejections.lock().await;
            if let Some(r) = rejections.iter().find(|r| {
                r.table == table
                    && record
                        .get(&r.column)
                        .is_some_and(|v| value_matches(v, &r.value))
            }) {
                return Err(StoreError::Rejected {
                    status: 400,
                    message: r.message.clone(),
                });
            }
        }

        let mut tables = self.tables.lock().await;
        let rows = tables.entry(table.to_string()).or_default();

        for columns in self.unique.get(table).into_iter().flatten() {
            let clash = rows.iter().any(|row| {
                columns
                    .iter()
                    .all(|c| row.get(c).is_some_and(|v| Some(v) == record.get(c)))
            });
            if clash {
                return Err(StoreError::UniqueViolation(format!(
                    "duplicate key value violates unique constraint on {table}({})",
                    columns.join(", ")
                )));
            }
        }

        let id = match record.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => {
                let id = Uuid::new_v4().to_string();
                record.insert("id".into(), Value::String(id.clone()));
                id
            }
        };
        rows.push(record);
        Ok(id)
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>, StoreError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        let tables = self.tables.lock().await;
        let mut rows: Vec<Record> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query.filters.iter().all(|f| {
                            row.get(&f.column)
                                .is_some_and(|v| value_matches(v, &f.value))
                        })
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn query_range(
        &self,
        table: &str,
        offset: usize,
        count: usize,
    ) -> Result<Vec<Record>, StoreError> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;

        let tables = self.tables.lock().await;
        Ok(tables
            .get(table)
            .map(|rows| rows.iter().skip(offset).take(count).cloned().collect())
            .unwrap_or_default())
    }
}

fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Null => false,
        other => other.to_string() == expected,
    }
}

// Timestamps compare as instants; RFC 3339 text with varying fraction
// digits does not sort lexically.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::<FixedOffset>::parse_from_rfc3339(x),
                DateTime::<FixedOffset>::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(_), None) => CmpOrdering::Greater,
        (None, Some(_)) => CmpOrdering::Less,
        _ => CmpOrdering::Equal,
    }
}
