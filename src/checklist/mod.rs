//! Checklist de inspeção: catálogo de perguntas, validação das respostas e
//! gravação no layout configurado.

mod catalog;
mod model;
mod store;
mod validator;

pub use catalog::{ItemKey, Question, QuestionCatalog};
pub use model::{Checklist, ChecklistItem, ItemStatus, STATUS_SYMBOLS};
pub use store::{
    AggregatedChecklistStore, ChecklistMode, ChecklistStore, ChecklistStrategy,
    DEFAULT_AGGREGATED_TABLE, DEFAULT_ITEMS_TABLE, PerItemChecklistStore,
};
pub use validator::{ChecklistAnswers, ChecklistValidator, DEFAULT_MANDATORY_OBSERVATIONS};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::fetch::PaginatedFetcher;
use crate::registration::RegistrationService;
use crate::scan::WORK_ORDER_LEN;
use crate::store::Store;

/// Um número de série registrado que ainda aguarda checklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInspection {
    pub serial_number: String,
    pub work_order: String,
    pub registered_at: DateTime<Utc>,
}

/// Valida e grava checklists, um por número de série.
///
/// Submissões concorrentes do mesmo número de série dentro do serviço são
/// recusadas com `Busy` enquanto a primeira estiver em andamento.
pub struct ChecklistService<S> {
    store: Arc<S>,
    registrations: Arc<RegistrationService<S>>,
    validator: ChecklistValidator,
    strategy: ChecklistStrategy,
    fetcher: PaginatedFetcher,
    in_flight: Mutex<HashSet<String>>,
}

/// Mantém o número de série no conjunto em andamento até ser descartado.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    serial: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.serial);
    }
}

impl<S: Store> ChecklistService<S> {
    pub fn new(
        store: Arc<S>,
        registrations: Arc<RegistrationService<S>>,
        validator: ChecklistValidator,
        strategy: ChecklistStrategy,
    ) -> Self {
        Self {
            store,
            registrations,
            validator,
            strategy,
            fetcher: PaginatedFetcher::default(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_fetcher(mut self, fetcher: PaginatedFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn validator(&self) -> &ChecklistValidator {
        &self.validator
    }

    pub fn mode(&self) -> ChecklistMode {
        self.strategy.mode()
    }

    /// Valida e grava o checklist de `serial`.
    ///
    /// O número de série precisa ter apontamento e ainda não ter checklist.
    /// Sem `work_order` (ou com ela em branco), usa a OP do apontamento mais
    /// recente; uma OP informada precisa ter 11 caracteres.
    pub async fn submit(
        &self,
        serial: &str,
        answers: &ChecklistAnswers,
        operator: &str,
        work_order: Option<String>,
    ) -> Result<Checklist, EngineError> {
        let serial = serial.trim();
        if serial.is_empty() {
            return Err(EngineError::Validation("Serial number is required.".into()));
        }
        let _in_flight = self.begin(serial)?;

        let items = self.validator.validate(answers)?;
        let work_order = explicit_work_order(work_order)?;

        let Some(registration) = self.registrations.find_by_serial(serial).await? else {
            return Err(EngineError::Validation(format!(
                "Serial {serial} has no registration."
            )));
        };
        if self
            .strategy
            .has_checklist(self.store.as_ref(), serial)
            .await?
        {
            return Err(EngineError::Duplicate(format!(
                "Serial {serial} already has a checklist."
            )));
        }

        let checklist = Checklist {
            serial_number: serial.to_string(),
            work_order: Some(work_order.unwrap_or(registration.work_order)),
            operator: operator.to_string(),
            timestamp: Utc::now(),
            items,
        };
        if let Err(e) = self.strategy.persist(self.store.as_ref(), &checklist).await {
            warn!(serial, mode = ?self.strategy.mode(), error = %e, "checklist not saved");
            return Err(e);
        }
        info!(serial, items = checklist.items.len(), "checklist saved");
        Ok(checklist)
    }

    /// Números de série apontados hoje (horário da planta) ainda sem checklist.
    pub async fn pending_inspections(&self) -> Result<Vec<PendingInspection>, EngineError> {
        self.pending_on(self.registrations.today()).await
    }

    /// Apontamentos de `date` sem checklist, do mais antigo ao mais novo, um
    /// por número de série.
    pub async fn pending_on(&self, date: NaiveDate) -> Result<Vec<PendingInspection>, EngineError> {
        let registered = self.registrations.registered_on(date).await?;
        let inspected = self
            .strategy
            .inspected_serials(self.store.as_ref(), &self.fetcher)
            .await?;

        let mut seen = HashSet::new();
        Ok(registered
            .into_iter()
            .filter(|r| !inspected.contains(&r.serial_number))
            .filter(|r| seen.insert(r.serial_number.clone()))
            .map(|r| PendingInspection {
                serial_number: r.serial_number,
                work_order: r.work_order,
                registered_at: r.timestamp,
            })
            .collect())
    }

    fn begin(&self, serial: &str) -> Result<InFlight<'_>, EngineError> {
        if !lock(&self.in_flight).insert(serial.to_string()) {
            return Err(EngineError::Busy(serial.to_string()));
        }
        Ok(InFlight {
            set: &self.in_flight,
            serial: serial.to_string(),
        })
    }
}

/// OP informada pelo chamador, sem espaços. Em branco conta como ausente.
fn explicit_work_order(work_order: Option<String>) -> Result<Option<String>, EngineError> {
    let Some(work_order) = work_order else {
        return Ok(None);
    };
    let work_order = work_order.trim();
    if work_order.is_empty() {
        return Ok(None);
    }
    if work_order.chars().count() != WORK_ORDER_LEN {
        return Err(EngineError::Validation(format!(
            "Work order {work_order} must have {WORK_ORDER_LEN} characters."
        )));
    }
    Ok(Some(work_order.to_string()))
}

fn lock(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|e| e.into_inner())
}
