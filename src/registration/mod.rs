//! Registration of scanned units: duplicate guard, writer and the cached
//! listings built on top of them.

mod cache;
mod guard;
mod writer;

pub use cache::RecentCache;
pub use guard::{DuplicateGuard, DuplicatePolicy, GuardDecision};
pub use writer::{RegistrationWriter, validate_pair};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::fetch::PaginatedFetcher;
use crate::store::{Query, Record, Store, StoreError};

pub(crate) const COL_SERIAL: &str = "numero_serie";
pub(crate) const COL_WORK_ORDER: &str = "op";
pub(crate) const COL_OPERATOR: &str = "usuario";
pub(crate) const COL_TIMESTAMP: &str = "data_hora";

pub const DEFAULT_TABLE: &str = "apontamentos_mola";

/// São Paulo, where the line runs.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = -3;

/// Fixed UTC offset for `hours`; out-of-range values fall back to UTC.
pub fn plant_offset(hours: i32) -> FixedOffset {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// A unit linked to the work order it was completed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "numero_serie")]
    pub serial_number: String,
    #[serde(rename = "op")]
    pub work_order: String,
    #[serde(rename = "usuario")]
    pub operator: String,
    #[serde(rename = "data_hora")]
    pub timestamp: DateTime<Utc>,
}

impl Registration {
    pub fn to_record(&self) -> Result<Record, EngineError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(EngineError::Validation("registration is not an object".into())),
            Err(e) => Err(EngineError::Validation(e.to_string())),
        }
    }

    pub fn from_record(record: Record) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(record))
            .map_err(|e| StoreError::Malformed(format!("registration row: {e}")))
    }

    /// Calendar date of the registration in the plant's timezone.
    pub fn local_date(&self, offset: FixedOffset) -> NaiveDate {
        self.timestamp.with_timezone(&offset).date_naive()
    }
}

/// Today's registration count, total and per work order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total: usize,
    /// `(work_order, count)`, largest count first.
    pub by_work_order: Vec<(String, usize)>,
}

/// Registers scanned pairs and serves the registration listings.
pub struct RegistrationService<S> {
    store: Arc<S>,
    table: String,
    guard: DuplicateGuard,
    writer: RegistrationWriter,
    cache: Mutex<RecentCache>,
    recent_limit: usize,
    offset: FixedOffset,
    fetcher: PaginatedFetcher,
}

impl<S: Store> RegistrationService<S> {
    pub fn builder(store: Arc<S>) -> RegistrationServiceBuilder<S> {
        RegistrationServiceBuilder::new(store)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.guard.policy()
    }

    pub fn utc_offset(&self) -> FixedOffset {
        self.offset
    }

    /// Guard, then write. Blank input is rejected before the store is touched;
    /// a successful write drops the cached recent listing.
    pub async fn register(
        &self,
        serial: &str,
        work_order: &str,
        operator: &str,
    ) -> Result<Registration, EngineError> {
        validate_pair(serial, work_order)?;

        if let GuardDecision::Blocked(reason) =
            self.guard.check(self.store.as_ref(), serial, work_order).await?
        {
            return Err(EngineError::Duplicate(reason));
        }

        let registration = self
            .writer
            .write(self.store.as_ref(), serial, work_order, operator)
            .await?;
        self.lock_cache().invalidate();
        Ok(registration)
    }

    /// Newest registrations first, at most `recent_limit` rows, served from
    /// the TTL cache when fresh.
    pub async fn recent(&self) -> Result<Vec<Registration>, EngineError> {
        let generation = {
            let cache = self.lock_cache();
            if let Some(rows) = cache.get() {
                debug!(rows = rows.len(), "recent registrations served from cache");
                return Ok(rows);
            }
            cache.generation()
        };

        let query = Query::new()
            .order_desc(COL_TIMESTAMP)
            .limit(self.recent_limit);
        let rows = self
            .store
            .query(&self.table, &query)
            .await
            .map_err(EngineError::read)?;
        let rows = decode_rows(&self.table, rows);

        self.lock_cache().put(generation, rows.clone());
        Ok(rows)
    }

    /// The `n` newest registrations.
    pub async fn latest(&self, n: usize) -> Result<Vec<Registration>, EngineError> {
        let mut rows = self.recent().await?;
        rows.truncate(n);
        Ok(rows)
    }

    /// Registrations whose local date is `date`, oldest first.
    pub async fn registered_on(&self, date: NaiveDate) -> Result<Vec<Registration>, EngineError> {
        let mut rows: Vec<Registration> = self
            .recent()
            .await?
            .into_iter()
            .filter(|r| r.local_date(self.offset) == date)
            .collect();
        rows.sort_by_key(|r| r.timestamp);
        Ok(rows)
    }

    pub async fn registered_today(&self) -> Result<Vec<Registration>, EngineError> {
        self.registered_on(self.today()).await
    }

    pub async fn summary_for(&self, date: NaiveDate) -> Result<DailySummary, EngineError> {
        let rows = self.registered_on(date).await?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for r in &rows {
            *counts.entry(r.work_order.clone()).or_insert(0) += 1;
        }
        let mut by_work_order: Vec<(String, usize)> = counts.into_iter().collect();
        by_work_order.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(DailySummary {
            date,
            total: rows.len(),
            by_work_order,
        })
    }

    pub async fn summary_today(&self) -> Result<DailySummary, EngineError> {
        self.summary_for(self.today()).await
    }

    /// Every registration in the table, walked page by page. Bypasses the cache.
    /// Malformed rows are skipped.
    pub async fn all(&self) -> Result<Vec<Registration>, EngineError> {
        let rows = self
            .fetcher
            .fetch_all(self.store.as_ref(), &self.table)
            .await?;
        Ok(decode_rows(&self.table, rows))
    }

    /// Most recent registration of `serial`, if any.
    pub async fn find_by_serial(&self, serial: &str) -> Result<Option<Registration>, EngineError> {
        let query = Query::new()
            .eq(COL_SERIAL, serial)
            .order_desc(COL_TIMESTAMP)
            .limit(1);
        let row = self
            .store
            .query(&self.table, &query)
            .await
            .map_err(EngineError::read)?
            .into_iter()
            .next();
        row.map(Registration::from_record)
            .transpose()
            .map_err(EngineError::read)
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    // A poisoned lock only means a panic mid-update of plain data; the cache
    // stays usable.
    fn lock_cache(&self) -> MutexGuard<'_, RecentCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Listings skip rows that do not decode rather than failing as a whole.
fn decode_rows(table: &str, rows: Vec<Record>) -> Vec<Registration> {
    rows.into_iter()
        .filter_map(|row| match Registration::from_record(row) {
            Ok(registration) => Some(registration),
            Err(e) => {
                warn!(table, error = %e, "skipping malformed registration row");
                None
            }
        })
        .collect()
}

/// Builder for [`RegistrationService`]; every setting has the plant default.
pub struct RegistrationServiceBuilder<S> {
    store: Arc<S>,
    table: String,
    policy: DuplicatePolicy,
    cache_ttl: Duration,
    recent_limit: usize,
    offset: FixedOffset,
    fetcher: PaginatedFetcher,
}

impl<S: Store> RegistrationServiceBuilder<S> {
    fn new(store: Arc<S>) -> Self {
        Self {
            store,
            table: DEFAULT_TABLE.to_string(),
            policy: DuplicatePolicy::default(),
            cache_ttl: Duration::from_secs(10),
            recent_limit: 1000,
            offset: plant_offset(DEFAULT_UTC_OFFSET_HOURS),
            fetcher: PaginatedFetcher::default(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn fetcher(mut self, fetcher: PaginatedFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn build(self) -> RegistrationService<S> {
        RegistrationService {
            store: self.store,
            guard: DuplicateGuard::new(self.policy, self.table.clone()),
            writer: RegistrationWriter::new(self.table.clone()),
            table: self.table,
            cache: Mutex::new(RecentCache::new(self.cache_ttl)),
            recent_limit: self.recent_limit,
            offset: self.offset,
            fetcher: self.fetcher,
        }
    }
}
