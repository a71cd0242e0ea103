pub mod address;
pub mod processor;
pub mod routing;
pub mod transaction;

pub use address::{AddressKind, TransactionAddress};
pub use processor::{AppliedTransaction, LedgerTransactionProcessor};
pub use routing::{route, Effect};
pub use transaction::{Transaction, TransactionInput};
