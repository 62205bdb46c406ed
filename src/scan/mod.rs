mod classifier;
mod session;

pub use classifier::{SERIAL_LEN, ScanToken, TokenKind, WORK_ORDER_LEN, classify};
pub use session::{CorrelationMachine, SERIAL_REQUIRED, ScanSession, SessionState, Step};

use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::registration::{Registration, RegistrationService};
use crate::store::Store;

/// Result of feeding one scanner read into a session.
#[derive(Debug)]
pub enum ScanOutcome {
    /// Blank read; nothing happened.
    NoInput,
    /// Read of an unrecognised length.
    Ignored(String),
    SerialAccepted(String),
    SerialRequired,
    Registered(Registration),
    Failed(EngineError),
}

/// Feeds one raw scanner read through classify → correlate → guard → write.
///
/// Any non-blank read empties the session's input buffer so the next
/// physical scan starts clean.
pub async fn handle_input<S: Store>(
    session: &mut ScanSession,
    raw: &str,
    registrations: &RegistrationService<S>,
) -> ScanOutcome {
    session.set_input(raw);
    let Some(token) = classify(session.input()) else {
        return ScanOutcome::NoInput;
    };
    session.clear_input();

    match CorrelationMachine::accept(session, token.clone()) {
        Step::Ignored => {
            debug!(session = session.id(), value = %token.value, "ignoring scan of unknown length");
            ScanOutcome::Ignored(token.value)
        }
        Step::AwaitWorkOrder(serial) => {
            debug!(session = session.id(), %serial, "serial scanned");
            ScanOutcome::SerialAccepted(serial)
        }
        Step::SerialRequired => {
            warn!(session = session.id(), work_order = %token.value, "work order scanned before serial");
            ScanOutcome::SerialRequired
        }
        Step::Register { serial, work_order } => {
            let result = registrations
                .register(&serial, &work_order, session.operator())
                .await;
            CorrelationMachine::settle(session, &result);
            match result {
                Ok(registration) => {
                    info!(session = session.id(), %serial, %work_order, "unit registered");
                    ScanOutcome::Registered(registration)
                }
                Err(e) => {
                    warn!(session = session.id(), %serial, %work_order, error = %e, "registration failed");
                    ScanOutcome::Failed(e)
                }
            }
        }
    }
}
