use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classifier::{ScanToken, TokenKind};
use crate::error::EngineError;
use crate::registration::Registration;

/// Rejection recorded when a work order arrives before any serial.
pub const SERIAL_REQUIRED: &str = "serial required before work order";

/// The two states of the scan correlation machine.
///
/// A unit flows through: IDLE → AWAITING_WORK_ORDER → IDLE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    AwaitingWorkOrder,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::AwaitingWorkOrder => write!(f, "AWAITING_WORK_ORDER"),
        }
    }
}

/// Working memory of one operator terminal.
///
/// Lives for the duration of the session and is never persisted.
#[derive(Debug, Clone)]
pub struct ScanSession {
    id: String,
    operator: String,
    input: String,
    pending_serial: Option<String>,
    last_work_order: Option<String>,
    last_error: Option<String>,
}

impl ScanSession {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operator: operator.into(),
            input: String::new(),
            pending_serial: None,
            last_work_order: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn operator(&self) -> &str {
        &self.operator
    }

    pub fn state(&self) -> SessionState {
        if self.pending_serial.is_some() {
            SessionState::AwaitingWorkOrder
        } else {
            SessionState::Idle
        }
    }

    pub fn pending_serial(&self) -> Option<&str> {
        self.pending_serial.as_deref()
    }

    /// Work order of the last successful registration in this session.
    pub fn last_work_order(&self) -> Option<&str> {
        self.last_work_order.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current contents of the raw scanner input buffer.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, raw: &str) {
        self.input = raw.to_string();
    }

    pub(crate) fn clear_input(&mut self) {
        self.input.clear();
    }
}

/// What the caller must do after a token has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Invalid token; nothing changed.
    Ignored,
    /// A serial is now pending.
    AwaitWorkOrder(String),
    /// Work order arrived with no pending serial.
    SerialRequired,
    /// The pair is ready for the duplicate guard and writer. The pending
    /// serial has already been consumed.
    Register { serial: String, work_order: String },
}

/// Applies scan tokens to a [`ScanSession`].
pub struct CorrelationMachine;

impl CorrelationMachine {
    /// Apply `token` to the session.
    ///
    /// - `Serial` always replaces the pending serial and clears the last error.
    /// - `WorkOrder` with nothing pending leaves the state alone and records
    ///   [`SERIAL_REQUIRED`].
    /// - `WorkOrder` with a pending serial consumes it and asks for
    ///   registration; call [`CorrelationMachine::settle`] with the result.
    /// - `Invalid` is ignored.
    pub fn accept(session: &mut ScanSession, token: ScanToken) -> Step {
        match token.kind {
            TokenKind::Serial => {
                session.pending_serial = Some(token.value.clone());
                session.last_error = None;
                Step::AwaitWorkOrder(token.value)
            }
            TokenKind::WorkOrder => match session.pending_serial.take() {
                Some(serial) => Step::Register {
                    serial,
                    work_order: token.value,
                },
                None => {
                    session.last_error = Some(SERIAL_REQUIRED.to_string());
                    Step::SerialRequired
                }
            },
            TokenKind::Invalid => Step::Ignored,
        }
    }

    /// Records the outcome of a registration requested by [`Step::Register`].
    /// Either way the session is back to `Idle`; a failure must be rescanned
    /// from the serial.
    pub fn settle(session: &mut ScanSession, result: &Result<Registration, EngineError>) {
        session.pending_serial = None;
        match result {
            Ok(registration) => {
                session.last_work_order = Some(registration.work_order.clone());
                session.last_error = None;
            }
            Err(e) => {
                session.last_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::classify;
    use chrono::Utc;

    fn token(raw: &str) -> ScanToken {
        classify(raw).unwrap()
    }

    fn registration(serial: &str, work_order: &str) -> Registration {
        Registration {
            serial_number: serial.into(),
            work_order: work_order.into(),
            operator: "op".into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn new_session_is_idle() {
        let session = ScanSession::new("Operador_Logado");
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.pending_serial(), None);
        assert_eq!(session.last_error(), None);
        assert_eq!(session.operator(), "Operador_Logado");
    }

    #[test]
    fn serial_moves_to_awaiting() {
        let mut session = ScanSession::new("op");
        let step = CorrelationMachine::accept(&mut session, token("ABC123456"));
        assert_eq!(step, Step::AwaitWorkOrder("ABC123456".into()));
        assert_eq!(session.state(), SessionState::AwaitingWorkOrder);
        assert_eq!(session.pending_serial(), Some("ABC123456"));
    }

    #[test]
    fn new_serial_supersedes_pending_one() {
        let mut session = ScanSession::new("op");
        CorrelationMachine::accept(&mut session, token("ABC123456"));
        CorrelationMachine::accept(&mut session, token("XYZ987654"));
        assert_eq!(session.pending_serial(), Some("XYZ987654"));
    }

    #[test]
    fn work_order_without_serial_is_rejected() {
        let mut session = ScanSession::new("op");
        let step = CorrelationMachine::accept(&mut session, token("OP202412345"));
        assert_eq!(step, Step::SerialRequired);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.last_error(), Some(SERIAL_REQUIRED));
    }

    #[test]
    fn serial_clears_previous_error() {
        let mut session = ScanSession::new("op");
        CorrelationMachine::accept(&mut session, token("OP202412345"));
        CorrelationMachine::accept(&mut session, token("ABC123456"));
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn work_order_consumes_pending_serial() {
        let mut session = ScanSession::new("op");
        CorrelationMachine::accept(&mut session, token("ABC123456"));
        let step = CorrelationMachine::accept(&mut session, token("OP202412345"));
        assert_eq!(
            step,
            Step::Register {
                serial: "ABC123456".into(),
                work_order: "OP202412345".into()
            }
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn invalid_token_changes_nothing() {
        let mut session = ScanSession::new("op");
        CorrelationMachine::accept(&mut session, token("ABC123456"));
        let step = CorrelationMachine::accept(&mut session, token("12345"));
        assert_eq!(step, Step::Ignored);
        assert_eq!(session.pending_serial(), Some("ABC123456"));
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn settle_success_records_work_order() {
        let mut session = ScanSession::new("op");
        CorrelationMachine::settle(
            &mut session,
            &Ok(registration("ABC123456", "OP202412345")),
        );
        assert_eq!(session.last_work_order(), Some("OP202412345"));
        assert_eq!(session.last_error(), None);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn settle_failure_records_reason() {
        let mut session = ScanSession::new("op");
        CorrelationMachine::settle(
            &mut session,
            &Err(EngineError::Duplicate("Serial ABC123456 already registered.".into())),
        );
        assert_eq!(
            session.last_error(),
            Some("Serial ABC123456 already registered.")
        );
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn state_display() {
        assert_eq!(SessionState::Idle.to_string(), "IDLE");
        assert_eq!(
            SessionState::AwaitingWorkOrder.to_string(),
            "AWAITING_WORK_ORDER"
        );
    }
}
