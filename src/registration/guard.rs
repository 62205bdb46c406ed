use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{COL_SERIAL, COL_WORK_ORDER};
use crate::error::EngineError;
use crate::store::{Query, Store};

/// Which prior registrations block a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Any registration of the serial blocks, whatever its work order.
    #[default]
    PerSerial,
    /// Only a registration of the same serial under the same work order blocks.
    PerSerialAndWorkOrder,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::PerSerial => write!(f, "per_serial"),
            DuplicatePolicy::PerSerialAndWorkOrder => write!(f, "per_serial_and_work_order"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allowed,
    Blocked(String),
}

/// Pre-write duplicate check.
///
/// The check and the following write are two separate store calls, so two
/// terminals can both pass the check. Only a uniqueness constraint on the
/// table closes that window; the writer maps such a late violation to
/// [`EngineError::Duplicate`] as well.
#[derive(Debug, Clone)]
pub struct DuplicateGuard {
    policy: DuplicatePolicy,
    table: String,
}

impl DuplicateGuard {
    pub fn new(policy: DuplicatePolicy, table: impl Into<String>) -> Self {
        Self {
            policy,
            table: table.into(),
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub async fn check<S: Store>(
        &self,
        store: &S,
        serial: &str,
        work_order: &str,
    ) -> Result<GuardDecision, EngineError> {
        let query = match self.policy {
            DuplicatePolicy::PerSerial => Query::new().eq(COL_SERIAL, serial),
            DuplicatePolicy::PerSerialAndWorkOrder => Query::new()
                .eq(COL_SERIAL, serial)
                .eq(COL_WORK_ORDER, work_order),
        }
        .limit(1);

        let existing = store
            .query(&self.table, &query)
            .await
            .map_err(EngineError::read)?;

        if existing.is_empty() {
            return Ok(GuardDecision::Allowed);
        }
        debug!(%serial, %work_order, policy = %self.policy, "duplicate registration blocked");
        let reason = match self.policy {
            DuplicatePolicy::PerSerial => format!("Serial {serial} already registered."),
            DuplicatePolicy::PerSerialAndWorkOrder => {
                format!("Serial {serial} already registered under work order {work_order}.")
            }
        };
        Ok(GuardDecision::Blocked(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn store_with(serial: &str, work_order: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .seed(
                "apontamentos_mola",
                vec![
                    json!({"numero_serie": serial, "op": work_order})
                        .as_object()
                        .cloned()
                        .unwrap(),
                ],
            )
            .await;
        store
    }

    #[tokio::test]
    async fn per_serial_blocks_any_work_order() {
        let store = store_with("ABC123456", "OP202412345").await;
        let guard = DuplicateGuard::new(DuplicatePolicy::PerSerial, "apontamentos_mola");

        let same = guard.check(&store, "ABC123456", "OP202412345").await.unwrap();
        let other = guard.check(&store, "ABC123456", "OP209999999").await.unwrap();
        assert_eq!(
            same,
            GuardDecision::Blocked("Serial ABC123456 already registered.".into())
        );
        assert!(matches!(other, GuardDecision::Blocked(_)));
    }

    #[tokio::test]
    async fn per_pair_allows_new_work_order() {
        let store = store_with("ABC123456", "OP202412345").await;
        let guard = DuplicateGuard::new(DuplicatePolicy::PerSerialAndWorkOrder, "apontamentos_mola");

        let same = guard.check(&store, "ABC123456", "OP202412345").await.unwrap();
        let other = guard.check(&store, "ABC123456", "OP209999999").await.unwrap();
        assert!(matches!(same, GuardDecision::Blocked(ref r) if r.contains("OP202412345")));
        assert_eq!(other, GuardDecision::Allowed);
    }

    #[tokio::test]
    async fn unknown_serial_is_allowed() {
        let store = store_with("ABC123456", "OP202412345").await;
        let guard = DuplicateGuard::new(DuplicatePolicy::PerSerial, "apontamentos_mola");
        let decision = guard.check(&store, "XYZ987654", "OP202412345").await.unwrap();
        assert_eq!(decision, GuardDecision::Allowed);
    }

    #[test]
    fn policy_deserializes_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: DuplicatePolicy,
        }
        let w: Wrapper = toml::from_str(r#"policy = "per_serial_and_work_order""#).unwrap();
        assert_eq!(w.policy, DuplicatePolicy::PerSerialAndWorkOrder);
    }
}
