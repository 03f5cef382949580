use thiserror::Error;

use labstock_auth::AuthzError;
use labstock_core::DomainError;
use labstock_stock::StockOverflow;

use crate::command_dispatcher::DispatchError;
use crate::event_store::EventStoreError;

/// Error surfaced by every [`LedgerService`](super::LedgerService) operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authorization(String),

    /// Wrong status for the operation, or lost an optimistic-concurrency race.
    #[error("{0}")]
    StateConflict(String),

    #[error("record not found")]
    NotFound,

    /// Unknown or inactive room/item code.
    #[error("{0}")]
    Referential(String),

    /// Store or decode failure. The message is for logs, not for callers.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::Authorization(_) => "authorization",
            LedgerError::StateConflict(_) => "state_conflict",
            LedgerError::NotFound => "not_found",
            LedgerError::Referential(_) => "referential",
            LedgerError::Storage(_) => "storage",
        }
    }
}

impl From<DispatchError> for LedgerError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Concurrency(msg) => {
                LedgerError::StateConflict(format!("record was modified concurrently ({msg})"))
            }
            DispatchError::Conflict(msg) => LedgerError::StateConflict(msg),
            DispatchError::Validation(msg) => LedgerError::Validation(msg),
            DispatchError::Unauthorized(msg) => LedgerError::Authorization(msg),
            DispatchError::NotFound => LedgerError::NotFound,
            DispatchError::Referential(msg) => LedgerError::Referential(msg),
            DispatchError::InvariantViolation(msg) => LedgerError::Storage(msg),
            DispatchError::Deserialize(msg) => LedgerError::Storage(msg),
            DispatchError::Store(err) => LedgerError::Storage(err.to_string()),
        }
    }
}

impl From<EventStoreError> for LedgerError {
    fn from(value: EventStoreError) -> Self {
        DispatchError::from(value).into()
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        DispatchError::from(value).into()
    }
}

impl From<StockOverflow> for LedgerError {
    fn from(value: StockOverflow) -> Self {
        LedgerError::Storage(value.to_string())
    }
}

impl From<AuthzError> for LedgerError {
    fn from(value: AuthzError) -> Self {
        LedgerError::Authorization(value.to_string())
    }
}
