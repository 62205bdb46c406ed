use chrono::Utc;
use tracing::info;

use super::Registration;
use crate::error::EngineError;
use crate::store::Store;

/// Persists registrations that already passed the duplicate guard.
#[derive(Debug, Clone)]
pub struct RegistrationWriter {
    table: String,
}

impl RegistrationWriter {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Stamps the current UTC instant and inserts one row. No retry; a store
    /// uniqueness violation comes back as [`EngineError::Duplicate`].
    pub async fn write<S: Store>(
        &self,
        store: &S,
        serial: &str,
        work_order: &str,
        operator: &str,
    ) -> Result<Registration, EngineError> {
        validate_pair(serial, work_order)?;

        let registration = Registration {
            serial_number: serial.to_string(),
            work_order: work_order.to_string(),
            operator: operator.to_string(),
            timestamp: Utc::now(),
        };
        let id = store
            .insert(&self.table, registration.to_record()?)
            .await
            .map_err(EngineError::write)?;

        info!(%id, serial, work_order, operator, "registration written");
        Ok(registration)
    }
}

/// Rejects a blank serial or work order before any store access.
pub fn validate_pair(serial: &str, work_order: &str) -> Result<(), EngineError> {
    if serial.trim().is_empty() || work_order.trim().is_empty() {
        return Err(EngineError::Validation(
            "Serial number and work order are required.".into(),
        ));
    }
    Ok(())
}
