use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::ledger::address::TransactionAddress;
use crate::types::{Timestamp, TransactionId};

/// validated request to move money, as handed over by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub id: TransactionId,
    pub timestamp: Timestamp,
    pub from: TransactionAddress,
    pub to: TransactionAddress,
    pub amount: Money,
    #[serde(default)]
    pub is_refund: bool,
}

impl TransactionInput {
    pub fn new(
        id: TransactionId,
        timestamp: Timestamp,
        from: TransactionAddress,
        to: TransactionAddress,
        amount: Money,
    ) -> Self {
        Self {
            id,
            timestamp,
            from,
            to,
            amount,
            is_refund: false,
        }
    }

    /// reverse the polarity of the effect for the same address pair
    pub fn refund(mut self) -> Self {
        self.is_refund = true;
        self
    }
}

/// committed, immutable money movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: TransactionId,
    timestamp: Timestamp,
    from: TransactionAddress,
    to: TransactionAddress,
    amount: Money,
    is_refund: bool,
    entry_timestamp: Timestamp,
}

impl Transaction {
    pub(crate) fn record(input: TransactionInput, entry_timestamp: Timestamp) -> Self {
        Self {
            id: input.id,
            timestamp: input.timestamp,
            from: input.from,
            to: input.to,
            amount: input.amount,
            is_refund: input.is_refund,
            entry_timestamp,
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn from(&self) -> &TransactionAddress {
        &self.from
    }

    pub fn to(&self) -> &TransactionAddress {
        &self.to
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn is_refund(&self) -> bool {
        self.is_refund
    }

    pub fn entry_timestamp(&self) -> Timestamp {
        self.entry_timestamp
    }

    /// amount with refund polarity applied
    pub fn signed_amount(&self) -> Money {
        self.amount.signed(self.is_refund)
    }

    pub fn touches(&self, address: &TransactionAddress) -> bool {
        self.from == *address || self.to == *address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_refund_signs_amount() {
        let input = TransactionInput::new(
            Uuid::new_v4(),
            Timestamp::from_days(1),
            TransactionAddress::Budget(Uuid::new_v4()),
            TransactionAddress::Loan(Uuid::new_v4()),
            Money::from_major(500),
        );

        let plain = Transaction::record(input.clone(), Timestamp::from_days(2));
        let refund = Transaction::record(input.refund(), Timestamp::from_days(2));

        assert_eq!(plain.signed_amount(), Money::from_major(500));
        assert_eq!(refund.signed_amount(), Money::from_major(-500));
        assert_eq!(refund.entry_timestamp(), Timestamp::from_days(2));
    }

    #[test]
    fn test_input_refund_defaults_to_false() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "timestamp": 86400,
            "from": {"kind": "Outside"},
            "to": {"kind": "Budget", "id": "00000000-0000-0000-0000-000000000002"},
            "amount": "250.5"
        }"#;
        let input: TransactionInput = serde_json::from_str(json).unwrap();

        assert!(!input.is_refund);
        assert_eq!(input.amount, Money::from_str_exact("250.5").unwrap());
        assert_eq!(input.from, TransactionAddress::Outside);
    }
}
