use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::ledger::TransactionAddress;
use crate::types::{ActorId, ChainId, LoanId, Timestamp, TransactionId};

/// which kind of entity an event is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Loan,
    Budget,
    InterestBucket,
}

/// all events emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // registration events
    BudgetOpened {
        budget_id: Uuid,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },
    InterestBucketOpened {
        bucket_id: Uuid,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },
    LoanOpened {
        loan_id: LoanId,
        initial_principal: Money,
        started_on: Timestamp,
        closes_at: Timestamp,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },

    // revision events
    RevisionAppended {
        chain_id: ChainId,
        effective_at: Timestamp,
        chain_version: u64,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },

    // transaction events
    TransactionApplied {
        transaction_id: TransactionId,
        from: TransactionAddress,
        to: TransactionAddress,
        amount: Money,
        is_refund: bool,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },
    TransactionRejected {
        transaction_id: TransactionId,
        reason: String,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },

    // aggregate events
    AggregatesRecomputed {
        entity_id: Uuid,
        kind: EntityKind,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },
    IntegrityViolation {
        entity_id: Option<Uuid>,
        message: String,
        actor: ActorId,
        entry_timestamp: Timestamp,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains_store() {
        let mut store = EventStore::new();
        store.emit(Event::BudgetOpened {
            budget_id: Uuid::new_v4(),
            actor: "ops".to_string(),
            entry_timestamp: Timestamp::from_days(1),
        });

        assert_eq!(store.events().len(), 1);
        let taken = store.take_events();
        assert_eq!(taken.len(), 1);
        assert!(store.events().is_empty());
    }
}
