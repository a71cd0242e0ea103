use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::interest::AccrualEngine;
use crate::ledger::{route, Effect, Transaction, TransactionAddress};
use crate::payments::{AmortizationSchedule, PrincipalPayment};
use crate::state::{BucketAggregates, BudgetAggregates, InterestBucket, Loan, LoanAggregates, Budget};

/// derives entity aggregates from committed transactions.
///
/// Full mode replays every transaction from scratch; incremental mode folds
/// one new transaction into existing totals. Both modes must agree exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateRecalculator {
    engine: AccrualEngine,
}

impl AggregateRecalculator {
    pub fn new(engine: AccrualEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &AccrualEngine {
        &self.engine
    }

    /// signed principal repayments of a loan, in the order given
    pub fn principal_payments(loan: &Loan, transactions: &[Transaction]) -> Vec<PrincipalPayment> {
        transactions
            .iter()
            .filter(|tx| *tx.from() == TransactionAddress::Loan(loan.id))
            .filter(|tx| matches!(tx.to(), TransactionAddress::Budget(_)))
            .map(|tx| PrincipalPayment::new(tx.timestamp(), tx.signed_amount()))
            .collect()
    }

    /// schedule over the loan's whole life
    pub fn lifetime_schedule(
        &self,
        loan: &Loan,
        payments: &[PrincipalPayment],
    ) -> Result<Option<AmortizationSchedule>> {
        if loan.closes_at <= loan.started_on {
            return Ok(None);
        }
        self.engine
            .compute_schedule(loan, loan.started_on, loan.closes_at, payments)
            .map(Some)
    }

    pub fn recompute_full_loan(
        &self,
        loan: &Loan,
        transactions: &[Transaction],
    ) -> Result<LoanAggregates> {
        let mut aggregates = LoanAggregates::default();
        for tx in transactions {
            apply_loan_flow(loan, &mut aggregates, tx)?;
        }

        let payments = Self::principal_payments(loan, transactions);
        aggregates.calculated_charged_interest = self
            .lifetime_schedule(loan, &payments)?
            .map(|schedule| schedule.total_interest)
            .unwrap_or(Money::ZERO);
        aggregates.calculated_remaining_principal =
            loan.initial_principal - aggregates.calculated_total_paid_principal;

        Ok(aggregates)
    }

    /// fold one new transaction into a loan's aggregates.
    ///
    /// `prior` holds the loan's transactions committed before `tx`. Only a
    /// principal repayment moves charged interest, and only from the last
    /// partition boundary at or before its timestamp onward.
    pub fn apply_incremental_loan(
        &self,
        loan: &Loan,
        current: LoanAggregates,
        prior: &[Transaction],
        tx: &Transaction,
    ) -> Result<LoanAggregates> {
        let mut aggregates = current;
        apply_loan_flow(loan, &mut aggregates, tx)?;

        if route(tx.from(), tx.to())?.repaid_loan() == Some(loan.id) {
            aggregates.calculated_charged_interest += self.interest_delta(loan, prior, tx)?;
        }
        aggregates.calculated_remaining_principal =
            loan.initial_principal - aggregates.calculated_total_paid_principal;

        Ok(aggregates)
    }

    fn interest_delta(&self, loan: &Loan, prior: &[Transaction], tx: &Transaction) -> Result<Money> {
        if loan.closes_at <= loan.started_on || tx.timestamp() >= loan.closes_at {
            return Ok(Money::ZERO);
        }

        let before = Self::principal_payments(loan, prior);
        let mut after = before.clone();
        after.push(PrincipalPayment::new(tx.timestamp(), tx.signed_amount()));

        let start = self.engine.boundary_at_or_before(loan, &before, tx.timestamp());
        let old_tail = self
            .engine
            .compute_schedule(loan, start, loan.closes_at, &before)?;
        let new_tail = self
            .engine
            .compute_schedule(loan, start, loan.closes_at, &after)?;

        Ok(new_tail.total_interest - old_tail.total_interest)
    }

    /// `funded` holds the loans opened against this budget; their initial
    /// principal counts as lent before any transaction
    pub fn recompute_full_budget(
        &self,
        budget: &Budget,
        funded: &[Loan],
        transactions: &[Transaction],
    ) -> Result<BudgetAggregates> {
        let mut aggregates = BudgetAggregates::default();
        for loan in funded {
            aggregates = self.apply_loan_opening(budget, aggregates, loan);
        }
        for tx in transactions {
            apply_budget_flow(budget, &mut aggregates, tx)?;
        }
        Ok(aggregates)
    }

    /// fold the opening of a loan into its funding budget's aggregates
    pub fn apply_loan_opening(
        &self,
        budget: &Budget,
        current: BudgetAggregates,
        loan: &Loan,
    ) -> BudgetAggregates {
        let mut aggregates = current;
        if loan.funding_budget == Some(budget.id) {
            aggregates.calculated_lended_amount += loan.initial_principal;
        }
        aggregates
    }

    pub fn apply_incremental_budget(
        &self,
        budget: &Budget,
        current: BudgetAggregates,
        tx: &Transaction,
    ) -> Result<BudgetAggregates> {
        let mut aggregates = current;
        apply_budget_flow(budget, &mut aggregates, tx)?;
        Ok(aggregates)
    }

    pub fn recompute_full_bucket(
        &self,
        bucket: &InterestBucket,
        transactions: &[Transaction],
    ) -> Result<BucketAggregates> {
        let mut aggregates = BucketAggregates::default();
        for tx in transactions {
            apply_bucket_flow(bucket, &mut aggregates, tx)?;
        }
        Ok(aggregates)
    }

    pub fn apply_incremental_bucket(
        &self,
        bucket: &InterestBucket,
        current: BucketAggregates,
        tx: &Transaction,
    ) -> Result<BucketAggregates> {
        let mut aggregates = current;
        apply_bucket_flow(bucket, &mut aggregates, tx)?;
        Ok(aggregates)
    }
}

/// fail with Integrity when the two modes disagree
pub fn ensure_agreement<T>(what: &str, full: &T, incremental: &T) -> Result<()>
where
    T: PartialEq + std::fmt::Debug,
{
    if full == incremental {
        return Ok(());
    }
    Err(LedgerError::Integrity {
        message: format!(
            "{} diverged: full {:?}, incremental {:?}",
            what, full, incremental
        ),
    })
}

fn apply_loan_flow(loan: &Loan, aggregates: &mut LoanAggregates, tx: &Transaction) -> Result<()> {
    let amount = tx.signed_amount();
    match route(tx.from(), tx.to())? {
        Effect::Lend { loan: id, .. } if id == loan.id => {
            aggregates.calculated_funded_amount += amount;
        }
        Effect::RepayPrincipal { loan: id, .. } if id == loan.id => {
            aggregates.calculated_total_paid_principal += amount;
        }
        Effect::PayInterest { loan: id, .. } if id == loan.id => {
            aggregates.calculated_paid_interest += amount;
        }
        Effect::FundLoan { loan: id } if id == loan.id => {
            aggregates.calculated_total_amount += amount;
        }
        Effect::DisburseLoan { loan: id } if id == loan.id => {
            aggregates.calculated_total_amount -= amount;
        }
        _ => {}
    }
    Ok(())
}

fn apply_budget_flow(
    budget: &Budget,
    aggregates: &mut BudgetAggregates,
    tx: &Transaction,
) -> Result<()> {
    let amount = tx.signed_amount();
    match route(tx.from(), tx.to())? {
        Effect::Lend { budget: id, .. } if id == budget.id => {
            aggregates.calculated_lended_amount += amount;
        }
        Effect::RepayPrincipal { budget: id, .. } if id == budget.id => {
            aggregates.calculated_lended_amount -= amount;
        }
        Effect::FundBudget { budget: id } if id == budget.id => {
            aggregates.calculated_total_amount += amount;
        }
        Effect::WithdrawBudget { budget: id } if id == budget.id => {
            aggregates.calculated_total_amount -= amount;
        }
        _ => {}
    }
    Ok(())
}

fn apply_bucket_flow(
    bucket: &InterestBucket,
    aggregates: &mut BucketAggregates,
    tx: &Transaction,
) -> Result<()> {
    if let Effect::PayInterest { bucket: id, .. } = route(tx.from(), tx.to())? {
        if id == bucket.id {
            aggregates.calculated_collected_interest += tx.signed_amount();
        }
    }
    Ok(())
}
