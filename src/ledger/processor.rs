use tracing::{debug, error, info, warn};

use crate::aggregate::{ensure_agreement, AggregateRecalculator, EntityAggregates};
use crate::config::LedgerConfig;
use crate::errors::{LedgerError, Result};
use crate::ledger::routing::{route, Effect};
use crate::ledger::{Transaction, TransactionAddress, TransactionInput};
use crate::store::{Change, EntityLocks, LedgerStore, UnitOfWork};
use crate::types::Timestamp;

/// a committed transaction with the aggregates it produced
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTransaction {
    pub transaction: Transaction,
    pub aggregates: Vec<EntityAggregates>,
}

/// validates, routes and commits ledger transactions
pub struct LedgerTransactionProcessor<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    locks: &'a EntityLocks,
    recalculator: AggregateRecalculator,
    config: &'a LedgerConfig,
}

impl<'a, S: LedgerStore + ?Sized> LedgerTransactionProcessor<'a, S> {
    pub fn new(
        store: &'a S,
        locks: &'a EntityLocks,
        recalculator: AggregateRecalculator,
        config: &'a LedgerConfig,
    ) -> Self {
        Self {
            store,
            locks,
            recalculator,
            config,
        }
    }

    /// apply one transaction.
    ///
    /// Every check runs and every touched aggregate is recomputed before the
    /// single commit; any failure leaves the store as it was.
    pub fn apply(
        &self,
        input: TransactionInput,
        entry_timestamp: Timestamp,
    ) -> Result<AppliedTransaction> {
        debug!(transaction = %input.id, from = %input.from, to = %input.to, "applying transaction");

        if input.from == input.to {
            return Err(LedgerError::InvalidAddressPair {
                from: input.from.to_string(),
                to: input.to.to_string(),
            });
        }
        if !input.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: input.amount,
            });
        }
        route(&input.from, &input.to)?;

        let entities: Vec<_> = [input.from, input.to]
            .iter()
            .filter_map(|address| address.entity_id())
            .collect();
        let _guard = self.locks.acquire(&entities, self.config.lock_timeout())?;

        if self.store.contains_transaction(input.id)? {
            warn!(transaction = %input.id, "duplicate transaction rejected");
            return Err(LedgerError::DuplicateTransaction { id: input.id });
        }

        let transaction = Transaction::record(input, entry_timestamp);
        let mut unit = UnitOfWork::for_transaction(transaction.clone());
        let mut aggregates = Vec::with_capacity(2);
        for address in [*transaction.from(), *transaction.to()] {
            if let Some(updated) = self.stage(&address, &transaction, &mut unit)? {
                aggregates.push(updated);
            }
        }

        self.store.commit(unit)?;
        info!(
            transaction = %transaction.id(),
            amount = %transaction.amount(),
            refund = transaction.is_refund(),
            "transaction committed"
        );

        Ok(AppliedTransaction {
            transaction,
            aggregates,
        })
    }

    fn stage(
        &self,
        address: &TransactionAddress,
        tx: &Transaction,
        unit: &mut UnitOfWork,
    ) -> Result<Option<EntityAggregates>> {
        let verify = self.config.verify_incremental;
        let staged = match *address {
            TransactionAddress::Loan(id) => {
                let mut loan = self.store.load_loan(id)?;
                if let Effect::RepayPrincipal { budget, .. } = route(tx.from(), tx.to())? {
                    if loan.funding_budget.is_some_and(|funding| funding != budget) {
                        warn!(
                            loan = %id,
                            budget = %budget,
                            "principal repaid to a budget other than the funding budget"
                        );
                    }
                }
                let prior = self.store.transactions_for(address)?;
                let incremental = self.recalculator.apply_incremental_loan(
                    &loan,
                    loan.aggregates,
                    &prior,
                    tx,
                )?;
                if verify {
                    let mut all = prior;
                    all.push(tx.clone());
                    let full = self.recalculator.recompute_full_loan(&loan, &all)?;
                    self.check("loan", &full, &incremental)?;
                }
                loan.aggregates = incremental;
                unit.stage(Change::UpdateLoan(loan));
                EntityAggregates::Loan {
                    id,
                    aggregates: incremental,
                }
            }
            TransactionAddress::Budget(id) => {
                let mut budget = self.store.load_budget(id)?;
                let incremental =
                    self.recalculator
                        .apply_incremental_budget(&budget, budget.aggregates, tx)?;
                if verify {
                    let funded = self.store.loans_funded_by(id)?;
                    let mut all = self.store.transactions_for(address)?;
                    all.push(tx.clone());
                    let full = self.recalculator.recompute_full_budget(&budget, &funded, &all)?;
                    self.check("budget", &full, &incremental)?;
                }
                budget.aggregates = incremental;
                unit.stage(Change::UpdateBudget(budget));
                EntityAggregates::Budget {
                    id,
                    aggregates: incremental,
                }
            }
            TransactionAddress::InterestBucket(id) => {
                let mut bucket = self.store.load_bucket(id)?;
                let incremental =
                    self.recalculator
                        .apply_incremental_bucket(&bucket, bucket.aggregates, tx)?;
                if verify {
                    let mut all = self.store.transactions_for(address)?;
                    all.push(tx.clone());
                    let full = self.recalculator.recompute_full_bucket(&bucket, &all)?;
                    self.check("interest bucket", &full, &incremental)?;
                }
                bucket.aggregates = incremental;
                unit.stage(Change::UpdateBucket(bucket));
                EntityAggregates::InterestBucket {
                    id,
                    aggregates: incremental,
                }
            }
            TransactionAddress::Outside => return Ok(None),
        };
        Ok(Some(staged))
    }

    fn check<T>(&self, what: &str, full: &T, incremental: &T) -> Result<()>
    where
        T: PartialEq + std::fmt::Debug,
    {
        ensure_agreement(what, full, incremental).map_err(|e| {
            error!(error = %e, "incremental aggregates diverged from full recomputation");
            e
        })
    }
}
