//! Domain error types.

use thiserror::Error;

/// Errors raised by pure domain validation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A feed record failed validation and must not reach the store.
    #[error("Invalid content record: {0}")]
    InvalidRecord(String),

    /// A menu record failed validation.
    #[error("Invalid menu record: {0}")]
    InvalidMenu(String),

    /// An outbox row carried a kind string this build does not know.
    #[error("Unknown outbox kind: '{0}'")]
    UnknownOutboxKind(String),
}
