use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::Checklist;
use crate::error::EngineError;
use crate::fetch::PaginatedFetcher;
use crate::registration::{COL_OPERATOR, COL_SERIAL, COL_TIMESTAMP, COL_WORK_ORDER};
use crate::store::{Query, Record, Store};

pub const DEFAULT_ITEMS_TABLE: &str = "checklists_mola_detalhes";
pub const DEFAULT_AGGREGATED_TABLE: &str = "checklists_mola";

/// How a checklist is laid out in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistMode {
    /// One row per item.
    #[default]
    PerItem,
    /// One row per checklist, items in a JSON column.
    Aggregated,
}

/// Persistence capability for validated checklists.
pub trait ChecklistStore {
    /// Writes `checklist`. Never overwrites existing rows.
    async fn persist<S: Store>(&self, store: &S, checklist: &Checklist) -> Result<(), EngineError>;

    /// Whether any checklist row exists for `serial`.
    async fn has_checklist<S: Store>(&self, store: &S, serial: &str) -> Result<bool, EngineError>;

    /// Every serial that already has a checklist, from a full table walk.
    async fn inspected_serials<S: Store>(
        &self,
        store: &S,
        fetcher: &PaginatedFetcher,
    ) -> Result<BTreeSet<String>, EngineError>;
}

/// One row per checklist, items under `itens` as `{KEY: {status, obs}}`.
#[derive(Debug, Clone)]
pub struct AggregatedChecklistStore {
    table: String,
}

impl AggregatedChecklistStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    fn record(checklist: &Checklist) -> Record {
        let items: serde_json::Map<String, Value> = checklist
            .items
            .iter()
            .map(|item| {
                (
                    item.key.to_string(),
                    json!({"status": item.status, "obs": item.observation}),
                )
            })
            .collect();
        object(json!({
            COL_SERIAL: checklist.serial_number,
            COL_WORK_ORDER: checklist.work_order,
            COL_OPERATOR: checklist.operator,
            COL_TIMESTAMP: checklist.timestamp,
            "itens": items,
        }))
    }
}

impl ChecklistStore for AggregatedChecklistStore {
    async fn persist<S: Store>(&self, store: &S, checklist: &Checklist) -> Result<(), EngineError> {
        let id = store
            .insert(&self.table, Self::record(checklist))
            .await
            .map_err(EngineError::write)?;
        debug!(%id, serial = %checklist.serial_number, "aggregated checklist written");
        Ok(())
    }

    async fn has_checklist<S: Store>(&self, store: &S, serial: &str) -> Result<bool, EngineError> {
        has_row_for(store, &self.table, serial).await
    }

    async fn inspected_serials<S: Store>(
        &self,
        store: &S,
        fetcher: &PaginatedFetcher,
    ) -> Result<BTreeSet<String>, EngineError> {
        serials_in(store, &self.table, fetcher).await
    }
}

/// One row per item: `item`, `status`, `observacao` next to the unit columns.
#[derive(Debug, Clone)]
pub struct PerItemChecklistStore {
    table: String,
}

impl PerItemChecklistStore {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl ChecklistStore for PerItemChecklistStore {
    /// Every item is attempted even after a failure. Rows already written
    /// stay; the error lists each failed item as `KEY: message`.
    async fn persist<S: Store>(&self, store: &S, checklist: &Checklist) -> Result<(), EngineError> {
        let mut errors = Vec::new();
        for item in &checklist.items {
            let record = object(json!({
                COL_SERIAL: checklist.serial_number,
                COL_WORK_ORDER: checklist.work_order,
                COL_OPERATOR: checklist.operator,
                COL_TIMESTAMP: checklist.timestamp,
                "item": item.key,
                "status": item.status,
                "observacao": item.observation,
            }));
            if let Err(e) = store.insert(&self.table, record).await {
                warn!(serial = %checklist.serial_number, item = %item.key, error = %e, "checklist item not written");
                errors.push(format!("{}: {}", item.key, e.message()));
            }
        }

        if errors.is_empty() {
            debug!(serial = %checklist.serial_number, items = checklist.items.len(), "checklist items written");
            Ok(())
        } else {
            Err(EngineError::Write(errors.join("; ")))
        }
    }

    async fn has_checklist<S: Store>(&self, store: &S, serial: &str) -> Result<bool, EngineError> {
        has_row_for(store, &self.table, serial).await
    }

    async fn inspected_serials<S: Store>(
        &self,
        store: &S,
        fetcher: &PaginatedFetcher,
    ) -> Result<BTreeSet<String>, EngineError> {
        serials_in(store, &self.table, fetcher).await
    }
}

/// The layout chosen at startup.
#[derive(Debug, Clone)]
pub enum ChecklistStrategy {
    PerItem(PerItemChecklistStore),
    Aggregated(AggregatedChecklistStore),
}

impl ChecklistStrategy {
    pub fn per_item(table: impl Into<String>) -> Self {
        ChecklistStrategy::PerItem(PerItemChecklistStore::new(table))
    }

    pub fn aggregated(table: impl Into<String>) -> Self {
        ChecklistStrategy::Aggregated(AggregatedChecklistStore::new(table))
    }

    /// Picks the implementation for `mode`, with the matching table.
    pub fn for_mode(mode: ChecklistMode, items_table: &str, aggregated_table: &str) -> Self {
        match mode {
            ChecklistMode::PerItem => Self::per_item(items_table),
            ChecklistMode::Aggregated => Self::aggregated(aggregated_table),
        }
    }

    pub fn mode(&self) -> ChecklistMode {
        match self {
            ChecklistStrategy::PerItem(_) => ChecklistMode::PerItem,
            ChecklistStrategy::Aggregated(_) => ChecklistMode::Aggregated,
        }
    }
}

impl Default for ChecklistStrategy {
    fn default() -> Self {
        Self::per_item(DEFAULT_ITEMS_TABLE)
    }
}

impl ChecklistStore for ChecklistStrategy {
    async fn persist<S: Store>(&self, store: &S, checklist: &Checklist) -> Result<(), EngineError> {
        match self {
            ChecklistStrategy::PerItem(s) => s.persist(store, checklist).await,
            ChecklistStrategy::Aggregated(s) => s.persist(store, checklist).await,
        }
    }

    async fn has_checklist<S: Store>(&self, store: &S, serial: &str) -> Result<bool, EngineError> {
        match self {
            ChecklistStrategy::PerItem(s) => s.has_checklist(store, serial).await,
            ChecklistStrategy::Aggregated(s) => s.has_checklist(store, serial).await,
        }
    }

    async fn inspected_serials<S: Store>(
        &self,
        store: &S,
        fetcher: &PaginatedFetcher,
    ) -> Result<BTreeSet<String>, EngineError> {
        match self {
            ChecklistStrategy::PerItem(s) => s.inspected_serials(store, fetcher).await,
            ChecklistStrategy::Aggregated(s) => s.inspected_serials(store, fetcher).await,
        }
    }
}

async fn has_row_for<S: Store>(store: &S, table: &str, serial: &str) -> Result<bool, EngineError> {
    let rows = store
        .query(table, &Query::new().eq(COL_SERIAL, serial).limit(1))
        .await
        .map_err(EngineError::read)?;
    Ok(!rows.is_empty())
}

async fn serials_in<S: Store>(
    store: &S,
    table: &str,
    fetcher: &PaginatedFetcher,
) -> Result<BTreeSet<String>, EngineError> {
    Ok(fetcher
        .fetch_all(store, table)
        .await?
        .iter()
        .filter_map(|row| row.get(COL_SERIAL).and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

fn object(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => Record::new(),
    }
}
