use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::types::{BudgetId, InterestBucketId, LoanId};

/// endpoint of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum TransactionAddress {
    Budget(BudgetId),
    Loan(LoanId),
    InterestBucket(InterestBucketId),
    Outside,
}

/// address tag without the id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Budget,
    Loan,
    InterestBucket,
    Outside,
}

impl TransactionAddress {
    pub fn kind(&self) -> AddressKind {
        match self {
            TransactionAddress::Budget(_) => AddressKind::Budget,
            TransactionAddress::Loan(_) => AddressKind::Loan,
            TransactionAddress::InterestBucket(_) => AddressKind::InterestBucket,
            TransactionAddress::Outside => AddressKind::Outside,
        }
    }

    /// id of the addressed entity; None for the outside world
    pub fn entity_id(&self) -> Option<Uuid> {
        match self {
            TransactionAddress::Budget(id)
            | TransactionAddress::Loan(id)
            | TransactionAddress::InterestBucket(id) => Some(*id),
            TransactionAddress::Outside => None,
        }
    }
}

impl fmt::Display for TransactionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionAddress::Budget(id) => write!(f, "budget:{}", id),
            TransactionAddress::Loan(id) => write!(f, "loan:{}", id),
            TransactionAddress::InterestBucket(id) => write!(f, "interest:{}", id),
            TransactionAddress::Outside => write!(f, "outside"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outside_has_no_entity() {
        assert_eq!(TransactionAddress::Outside.entity_id(), None);
        assert_eq!(TransactionAddress::Outside.kind(), AddressKind::Outside);

        let id = Uuid::new_v4();
        assert_eq!(TransactionAddress::Loan(id).entity_id(), Some(id));
    }

    #[test]
    fn test_tagged_json() {
        let id = Uuid::nil();
        let json = serde_json::to_string(&TransactionAddress::Budget(id)).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"Budget","id":"00000000-0000-0000-0000-000000000000"}"#
        );
        let outside = serde_json::to_string(&TransactionAddress::Outside).unwrap();
        assert_eq!(outside, r#"{"kind":"Outside"}"#);
    }
}
