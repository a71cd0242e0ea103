use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::Timestamp;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("out of order revision: {attempted} is not after head {head}")]
    OutOfOrderRevision {
        head: Timestamp,
        attempted: Timestamp,
    },

    #[error("not found: {what}")]
    NotFound {
        what: String,
    },

    #[error("already exists: {what}")]
    AlreadyExists {
        what: String,
    },

    #[error("invalid range: to {to} must be after from {from}")]
    InvalidRange {
        from: Timestamp,
        to: Timestamp,
    },

    #[error("no interest rate in force at {at}")]
    MissingRate {
        at: Timestamp,
    },

    #[error("duplicate transaction: {id}")]
    DuplicateTransaction {
        id: Uuid,
    },

    #[error("invalid address pair: {from} -> {to}")]
    InvalidAddressPair {
        from: String,
        to: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("concurrent mutation on {entity}: {message}")]
    ConcurrentMutation {
        entity: Uuid,
        message: String,
    },

    #[error("integrity violation: {message}")]
    Integrity {
        message: String,
    },

    #[error("calculation error: {message}")]
    Calculation {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

impl LedgerError {
    pub(crate) fn not_found(kind: &str, id: Uuid) -> Self {
        LedgerError::NotFound {
            what: format!("{} {}", kind, id),
        }
    }

    /// integrity failures abort and must never be repaired
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::Integrity { .. })
    }

    /// lock or version conflicts may succeed when retried unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentMutation { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_integrity_is_fatal() {
        let integrity = LedgerError::Integrity {
            message: "diverged".to_string(),
        };
        let duplicate = LedgerError::DuplicateTransaction { id: Uuid::nil() };

        assert!(integrity.is_fatal());
        assert!(!duplicate.is_fatal());
        assert!(!duplicate.is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = LedgerError::OutOfOrderRevision {
            head: Timestamp::from_days(10),
            attempted: Timestamp::from_days(5),
        };
        assert_eq!(
            err.to_string(),
            "out of order revision: 432000 is not after head 864000"
        );

        let err = LedgerError::ConcurrentMutation {
            entity: Uuid::nil(),
            message: "lock busy".to_string(),
        };
        assert!(err.is_retryable());
    }
}
