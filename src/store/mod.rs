pub mod locks;
pub mod memory;

use crate::errors::Result;
use crate::ledger::{Transaction, TransactionAddress};
use crate::revision::RevisionChain;
use crate::state::{Budget, InterestBucket, Loan};
use crate::terms::InterestRateTerm;
use crate::types::{BudgetId, InterestBucketId, LoanId, TransactionId};

pub use locks::{EntityGuard, EntityLocks};
pub use memory::MemoryStore;

/// one staged entity write
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    CreateLoan(Loan),
    CreateBudget(Budget),
    CreateBucket(InterestBucket),
    /// carries the version it was loaded at
    UpdateLoan(Loan),
    UpdateBudget(Budget),
    UpdateBucket(InterestBucket),
}

/// a transaction record and every entity it touched, committed together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWork {
    pub transaction: Option<Transaction>,
    pub changes: Vec<Change>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_transaction(transaction: Transaction) -> Self {
        Self {
            transaction: Some(transaction),
            changes: Vec::new(),
        }
    }

    pub fn stage(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.transaction.is_none() && self.changes.is_empty()
    }
}

/// persistence collaborator.
///
/// `commit` is all-or-nothing across the transaction record and every staged
/// change, and rejects updates whose loaded version is stale.
pub trait LedgerStore: Send + Sync {
    fn load_loan(&self, id: LoanId) -> Result<Loan>;
    fn load_budget(&self, id: BudgetId) -> Result<Budget>;
    fn load_bucket(&self, id: InterestBucketId) -> Result<InterestBucket>;

    fn load_rate_chain(&self, id: LoanId) -> Result<RevisionChain<InterestRateTerm>> {
        Ok(self.load_loan(id)?.interest_rate_chain)
    }

    /// loans opened against the budget
    fn loans_funded_by(&self, budget: BudgetId) -> Result<Vec<Loan>>;

    fn contains_transaction(&self, id: TransactionId) -> Result<bool>;

    /// transactions touching the address, in commit order
    fn transactions_for(&self, address: &TransactionAddress) -> Result<Vec<Transaction>>;

    fn commit(&self, unit: UnitOfWork) -> Result<()>;
}
