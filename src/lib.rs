pub mod aggregate;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod ledger;
pub mod payments;
pub mod revision;
pub mod service;
pub mod state;
pub mod store;
pub mod terms;
pub mod types;
pub mod views;

// re-export key types
pub use aggregate::{AggregateRecalculator, EntityAggregates};
pub use config::LedgerConfig;
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{EntityKind, Event, EventStore};
pub use interest::{AccrualEngine, ScheduleCache};
pub use ledger::{
    AddressKind, AppliedTransaction, Effect, LedgerTransactionProcessor, Transaction,
    TransactionAddress, TransactionInput,
};
pub use payments::{AmortizationInterval, AmortizationSchedule, PrincipalPayment};
pub use revision::{RevisionChain, RevisionNode};
pub use service::{LendingLedger, NewLoan, RevisionReceipt};
pub use state::{
    Budget, BudgetAggregates, BucketAggregates, InterestBucket, Loan, LoanAggregates,
};
pub use store::{LedgerStore, MemoryStore, UnitOfWork};
pub use terms::{InterestRateTerm, PaymentFrequencyTerm, RevisionValue};
pub use types::{
    ActorId, BudgetId, ChainId, ChainKind, DurationUnit, InterestBucketId, InterestKind, LoanId,
    PaymentCadence, PaymentOccurrence, Timestamp, TransactionId,
};
pub use views::{AggregatesView, LoanView, ScheduleView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
