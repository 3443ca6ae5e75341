//! Error types for the ledger, the contract and configuration.

use crate::auth::Role;
use crate::types::{MspId, ObjectType, Operation, TxId};
use thiserror::Error;

/// Substrings the ledger uses when it reports a losing MVCC race as text.
const CONFLICT_SIGNATURES: [&str; 3] = ["MVCC_READ_CONFLICT", "mvcc_read_conflict", "status code 11"];

/// Validation code the ledger assigns to a transaction that lost an MVCC race.
pub const MVCC_READ_CONFLICT_CODE: i32 = 11;

/// Whether a ledger error message carries the write-conflict signature.
pub fn is_mvcc_conflict_message(message: &str) -> bool {
    CONFLICT_SIGNATURES.iter().any(|sig| message.contains(sig))
}

/// Errors raised by a [`Ledger`](crate::ledger::Ledger) implementation.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("MVCC_READ_CONFLICT: key {key} changed before tx {tx_id} committed")]
    MvccReadConflict { key: String, tx_id: TxId },

    /// Rejection reported only as a status code and message.
    #[error("transaction rejected (status code {code}): {message}")]
    Rejected { code: i32, message: String },

    #[error("Invalid bookmark: {0}")]
    InvalidBookmark(String),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(u32),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// True when this error reports a losing MVCC race, whether typed or
    /// recognised from the status code / message signature.
    pub fn is_write_conflict(&self) -> bool {
        match self {
            LedgerError::MvccReadConflict { .. } => true,
            LedgerError::Rejected { code, message } => {
                *code == MVCC_READ_CONFLICT_CODE || is_mvcc_conflict_message(message)
            }
            _ => false,
        }
    }
}

/// Errors returned by contract operations.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("Unauthorized: {operation} requires role {required}, caller is {caller}")]
    Unauthorized {
        operation: Operation,
        required: Role,
        caller: MspId,
    },

    #[error("{kind} {key} does not exist")]
    NotFound { kind: ObjectType, key: String },

    #[error("Invalid transition on {key}: {operation} {reason}")]
    InvalidTransition {
        key: String,
        operation: Operation,
        reason: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Ledger error: {0}")]
    Ledger(String),
}

/// Classification of a [`ContractError`], surfaced unchanged to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    InvalidTransition,
    Serialization,
    WriteConflict,
    InvalidArgument,
    Ledger,
}

impl ErrorKind {
    /// Only write conflicts are transient.
    pub fn is_retryable(self) -> bool {
        self == ErrorKind::WriteConflict
    }
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::Unauthorized { .. } => ErrorKind::Unauthorized,
            ContractError::NotFound { .. } => ErrorKind::NotFound,
            ContractError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            ContractError::Serialization(_) => ErrorKind::Serialization,
            ContractError::WriteConflict(_) => ErrorKind::WriteConflict,
            ContractError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ContractError::Ledger(_) => ErrorKind::Ledger,
        }
    }

    pub(crate) fn not_found(kind: ObjectType, key: &str) -> Self {
        ContractError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub(crate) fn invalid_transition(key: &str, operation: Operation, reason: impl Into<String>) -> Self {
        ContractError::InvalidTransition {
            key: key.to_string(),
            operation,
            reason: reason.into(),
        }
    }
}

impl From<LedgerError> for ContractError {
    fn from(e: LedgerError) -> Self {
        if e.is_write_conflict() {
            return ContractError::WriteConflict(e.to_string());
        }
        match e {
            LedgerError::InvalidBookmark(_) | LedgerError::InvalidPageSize(_) => {
                ContractError::InvalidArgument(e.to_string())
            }
            LedgerError::Serialization(msg) => ContractError::Serialization(msg),
            other => ContractError::Ledger(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(e: serde_json::Error) -> Self {
        ContractError::Serialization(e.to_string())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for contract and gateway operations.
pub type Result<T> = std::result::Result<T, ContractError>;
