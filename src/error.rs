use std::fmt;

use thiserror::Error;

use crate::checklist::ItemKey;
use crate::store::StoreError;

/// Errors surfaced by the registration and checklist engine.
///
/// None of these are fatal: a session that receives one stays usable for
/// the next scan or submission.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller-fixable input problem. No store access was attempted.
    #[error("{0}")]
    Validation(String),

    /// The unit (or unit + work order) is already recorded, either caught by
    /// the pre-write guard or by a store uniqueness constraint.
    #[error("{0}")]
    Duplicate(String),

    #[error("read error: {0}")]
    Read(String),

    /// Store write failed. Carries the store's message verbatim.
    #[error("{0}")]
    Write(String),

    #[error("checklist submission already in progress for serial {0}")]
    Busy(String),

    /// One or more questions have no status. Any mandatory observations that
    /// are also missing are reported alongside.
    #[error("{}", describe_incomplete(missing, missing_observations))]
    Incomplete {
        missing: Vec<MissingItem>,
        missing_observations: Vec<MissingItem>,
    },

    #[error("missing mandatory observations: {}", join_items(missing))]
    MissingObservation { missing: Vec<MissingItem> },
}

impl EngineError {
    /// Maps a store error raised while reading.
    pub fn read(err: StoreError) -> Self {
        EngineError::Read(err.message())
    }

    /// Maps a store error raised while writing. A uniqueness violation is a
    /// late duplicate, not a write failure.
    pub fn write(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(msg) => EngineError::Duplicate(msg),
            other => EngineError::Write(other.message()),
        }
    }
}

/// A checklist question named by its 1-based index and item key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingItem {
    pub index: usize,
    pub key: ItemKey,
}

impl fmt::Display for MissingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index, self.key)
    }
}

fn join_items(items: &[MissingItem]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_incomplete(missing: &[MissingItem], missing_observations: &[MissingItem]) -> String {
    let mut msg = format!("unanswered questions: {}", join_items(missing));
    if !missing_observations.is_empty() {
        msg.push_str("; missing mandatory observations: ");
        msg.push_str(&join_items(missing_observations));
    }
    msg
}
