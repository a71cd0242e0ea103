use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::ledger::{Transaction, TransactionAddress};
use crate::state::{Budget, InterestBucket, Loan};
use crate::store::{Change, LedgerStore, UnitOfWork};
use crate::types::{BudgetId, InterestBucketId, LoanId, TransactionId};

#[derive(Debug, Default)]
struct Tables {
    loans: HashMap<LoanId, Loan>,
    budgets: HashMap<BudgetId, Budget>,
    buckets: HashMap<InterestBucketId, InterestBucket>,
    transactions: Vec<Transaction>,
    transaction_ids: HashSet<TransactionId>,
}

/// in-process store behind one reader-writer lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> usize {
        self.tables.read().transactions.len()
    }
}

fn stale(entity: Uuid, loaded: u64, stored: u64) -> LedgerError {
    LedgerError::ConcurrentMutation {
        entity,
        message: format!("loaded at version {}, store has {}", loaded, stored),
    }
}

fn exists(kind: &str, id: Uuid) -> LedgerError {
    LedgerError::AlreadyExists {
        what: format!("{} {}", kind, id),
    }
}

impl Tables {
    /// every check a unit must pass before anything is written
    fn check(&self, unit: &UnitOfWork) -> Result<()> {
        if let Some(tx) = &unit.transaction {
            if self.transaction_ids.contains(&tx.id()) {
                return Err(LedgerError::DuplicateTransaction { id: tx.id() });
            }
        }

        let mut seen = HashSet::new();
        for change in &unit.changes {
            let id = match change {
                Change::CreateLoan(loan) => {
                    if self.loans.contains_key(&loan.id) {
                        return Err(exists("loan", loan.id));
                    }
                    loan.id
                }
                Change::CreateBudget(budget) => {
                    if self.budgets.contains_key(&budget.id) {
                        return Err(exists("budget", budget.id));
                    }
                    budget.id
                }
                Change::CreateBucket(bucket) => {
                    if self.buckets.contains_key(&bucket.id) {
                        return Err(exists("interest bucket", bucket.id));
                    }
                    bucket.id
                }
                Change::UpdateLoan(loan) => {
                    let stored = self
                        .loans
                        .get(&loan.id)
                        .ok_or_else(|| LedgerError::not_found("loan", loan.id))?;
                    if stored.version != loan.version {
                        return Err(stale(loan.id, loan.version, stored.version));
                    }
                    loan.id
                }
                Change::UpdateBudget(budget) => {
                    let stored = self
                        .budgets
                        .get(&budget.id)
                        .ok_or_else(|| LedgerError::not_found("budget", budget.id))?;
                    if stored.version != budget.version {
                        return Err(stale(budget.id, budget.version, stored.version));
                    }
                    budget.id
                }
                Change::UpdateBucket(bucket) => {
                    let stored = self
                        .buckets
                        .get(&bucket.id)
                        .ok_or_else(|| LedgerError::not_found("interest bucket", bucket.id))?;
                    if stored.version != bucket.version {
                        return Err(stale(bucket.id, bucket.version, stored.version));
                    }
                    bucket.id
                }
            };
            if !seen.insert(id) {
                return Err(LedgerError::Integrity {
                    message: format!("entity {} staged twice in one unit of work", id),
                });
            }
        }
        Ok(())
    }

    fn apply(&mut self, unit: UnitOfWork) {
        for change in unit.changes {
            match change {
                Change::CreateLoan(loan) => {
                    self.loans.insert(loan.id, loan);
                }
                Change::CreateBudget(budget) => {
                    self.budgets.insert(budget.id, budget);
                }
                Change::CreateBucket(bucket) => {
                    self.buckets.insert(bucket.id, bucket);
                }
                Change::UpdateLoan(mut loan) => {
                    loan.version += 1;
                    self.loans.insert(loan.id, loan);
                }
                Change::UpdateBudget(mut budget) => {
                    budget.version += 1;
                    self.budgets.insert(budget.id, budget);
                }
                Change::UpdateBucket(mut bucket) => {
                    bucket.version += 1;
                    self.buckets.insert(bucket.id, bucket);
                }
            }
        }
        if let Some(tx) = unit.transaction {
            self.transaction_ids.insert(tx.id());
            self.transactions.push(tx);
        }
    }
}

impl LedgerStore for MemoryStore {
    fn load_loan(&self, id: LoanId) -> Result<Loan> {
        self.tables
            .read()
            .loans
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("loan", id))
    }

    fn load_budget(&self, id: BudgetId) -> Result<Budget> {
        self.tables
            .read()
            .budgets
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("budget", id))
    }

    fn load_bucket(&self, id: InterestBucketId) -> Result<InterestBucket> {
        self.tables
            .read()
            .buckets
            .get(&id)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("interest bucket", id))
    }

    fn loans_funded_by(&self, budget: BudgetId) -> Result<Vec<Loan>> {
        Ok(self
            .tables
            .read()
            .loans
            .values()
            .filter(|loan| loan.funding_budget == Some(budget))
            .cloned()
            .collect())
    }

    fn contains_transaction(&self, id: TransactionId) -> Result<bool> {
        Ok(self.tables.read().transaction_ids.contains(&id))
    }

    fn transactions_for(&self, address: &TransactionAddress) -> Result<Vec<Transaction>> {
        Ok(self
            .tables
            .read()
            .transactions
            .iter()
            .filter(|tx| tx.touches(address))
            .cloned()
            .collect())
    }

    fn commit(&self, unit: UnitOfWork) -> Result<()> {
        let mut tables = self.tables.write();
        if let Err(e) = tables.check(&unit) {
            debug!(error = %e, "commit rejected, nothing written");
            return Err(e);
        }

        let changes = unit.changes.len();
        let transaction = unit.transaction.as_ref().map(|tx| tx.id());
        tables.apply(unit);
        info!(?transaction, changes, "unit of work committed");
        Ok(())
    }
}
