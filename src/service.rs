use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::aggregate::{ensure_agreement, AggregateRecalculator, EntityAggregates};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{EntityKind, Event, EventStore};
use crate::interest::{AccrualEngine, ScheduleCache, ScheduleKey};
use crate::ledger::{LedgerTransactionProcessor, Transaction, TransactionAddress, TransactionInput};
use crate::payments::{expected_payment_dates, AmortizationSchedule};
use crate::revision::RevisionChain;
use crate::state::{Budget, BudgetAggregates, InterestBucket, Loan};
use crate::store::{Change, EntityLocks, LedgerStore, MemoryStore, UnitOfWork};
use crate::terms::{InterestRateTerm, PaymentFrequencyTerm, RevisionValue};
use crate::types::{
    ActorId, BudgetId, ChainId, ChainKind, InterestBucketId, LoanId, Timestamp,
};

/// terms for opening a loan
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub initial_principal: Money,
    pub started_on: Timestamp,
    pub closes_at: Timestamp,
    pub funding_budget: Option<BudgetId>,
    /// falls back to the funding budget's default rate
    pub interest_rate: Option<InterestRateTerm>,
    pub payment_frequency: PaymentFrequencyTerm,
    pub note: Option<String>,
}

/// what an accepted revision looks like from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionReceipt {
    pub chain_id: ChainId,
    pub entry_timestamp: Timestamp,
    pub previous: Option<Timestamp>,
    pub chain_version: u64,
}

/// the ledger core: revisioned loan terms, transactions and derived totals
pub struct LendingLedger<S: LedgerStore = MemoryStore> {
    store: S,
    config: LedgerConfig,
    locks: EntityLocks,
    recalculator: AggregateRecalculator,
    cache: ScheduleCache,
    events: Mutex<EventStore>,
}

impl LendingLedger<MemoryStore> {
    pub fn in_memory(config: LedgerConfig) -> Result<Self> {
        Self::new(MemoryStore::new(), config)
    }
}

impl<S: LedgerStore> LendingLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            recalculator: AggregateRecalculator::new(AccrualEngine::new(config.money_scale)),
            cache: ScheduleCache::new(config.schedule_cache_capacity),
            locks: EntityLocks::new(),
            events: Mutex::new(EventStore::new()),
            config,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    fn emit(&self, event: Event) {
        self.events.lock().emit(event);
    }

    /// open a budget
    pub fn open_budget(
        &self,
        default_interest_rate: InterestRateTerm,
        actor: &ActorId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Budget> {
        let budget = Budget::new(Uuid::new_v4(), default_interest_rate);
        let mut unit = UnitOfWork::new();
        unit.stage(Change::CreateBudget(budget.clone()));
        self.store.commit(unit)?;

        info!(budget = %budget.id, "budget opened");
        self.emit(Event::BudgetOpened {
            budget_id: budget.id,
            actor: actor.clone(),
            entry_timestamp: entry_timestamp(time_provider),
        });
        Ok(budget)
    }

    /// open an interest bucket
    pub fn open_interest_bucket(
        &self,
        actor: &ActorId,
        time_provider: &SafeTimeProvider,
    ) -> Result<InterestBucket> {
        let bucket = InterestBucket::new(Uuid::new_v4());
        let mut unit = UnitOfWork::new();
        unit.stage(Change::CreateBucket(bucket.clone()));
        self.store.commit(unit)?;

        info!(bucket = %bucket.id, "interest bucket opened");
        self.emit(Event::InterestBucketOpened {
            bucket_id: bucket.id,
            actor: actor.clone(),
            entry_timestamp: entry_timestamp(time_provider),
        });
        Ok(bucket)
    }

    /// open a loan; its chains are rooted at `started_on`
    pub fn open_loan(
        &self,
        terms: NewLoan,
        actor: &ActorId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Loan> {
        if terms.closes_at <= terms.started_on {
            return Err(LedgerError::InvalidRange {
                from: terms.started_on,
                to: terms.closes_at,
            });
        }
        if !terms.initial_principal.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: terms.initial_principal,
            });
        }

        let locked: Vec<_> = terms.funding_budget.into_iter().collect();
        let _guard = self.locks.acquire(&locked, self.config.lock_timeout())?;
        let budget = terms
            .funding_budget
            .map(|id| self.store.load_budget(id))
            .transpose()?;
        let rate = match (terms.interest_rate, &budget) {
            (Some(rate), _) => rate,
            (None, Some(budget)) => budget.default_interest_rate.clone(),
            (None, None) => return Err(LedgerError::MissingRate { at: terms.started_on }),
        };

        let mut loan = Loan::new(
            Uuid::new_v4(),
            terms.initial_principal,
            terms.started_on,
            terms.closes_at,
            rate,
            terms.payment_frequency,
        );
        loan.funding_budget = terms.funding_budget;
        loan.notes_chain = terms
            .note
            .map(|note| RevisionChain::new(note, terms.started_on));
        loan.aggregates = self.recalculator.recompute_full_loan(&loan, &[])?;

        let mut unit = UnitOfWork::new();
        unit.stage(Change::CreateLoan(loan.clone()));
        if let Some(mut budget) = budget {
            budget.aggregates = self.fund_from(&budget, &loan)?;
            unit.stage(Change::UpdateBudget(budget));
        }
        self.store.commit(unit)?;

        info!(loan = %loan.id, principal = %loan.initial_principal, "loan opened");
        self.emit(Event::LoanOpened {
            loan_id: loan.id,
            initial_principal: loan.initial_principal,
            started_on: loan.started_on,
            closes_at: loan.closes_at,
            actor: actor.clone(),
            entry_timestamp: entry_timestamp(time_provider),
        });
        Ok(loan)
    }

    /// the budget's aggregates once `loan` is opened against it
    fn fund_from(&self, budget: &Budget, loan: &Loan) -> Result<BudgetAggregates> {
        let incremental = self
            .recalculator
            .apply_loan_opening(budget, budget.aggregates, loan);
        if self.config.verify_incremental {
            let mut funded = self.store.loans_funded_by(budget.id)?;
            funded.push(loan.clone());
            let transactions = self
                .store
                .transactions_for(&TransactionAddress::Budget(budget.id))?;
            let full = self
                .recalculator
                .recompute_full_budget(budget, &funded, &transactions)?;
            if let Err(e) = ensure_agreement("budget", &full, &incremental) {
                error!(budget = %budget.id, error = %e, "budget aggregates diverged on loan opening");
                return Err(e);
            }
        }
        Ok(incremental)
    }

    pub fn loan(&self, id: LoanId) -> Result<Loan> {
        self.store.load_loan(id)
    }

    pub fn budget(&self, id: BudgetId) -> Result<Budget> {
        self.store.load_budget(id)
    }

    pub fn interest_bucket(&self, id: InterestBucketId) -> Result<InterestBucket> {
        self.store.load_bucket(id)
    }

    /// append a revision to one of a loan's chains.
    ///
    /// A rate revision recomputes the loan's charged interest from scratch
    /// and drops every cached schedule of the loan.
    pub fn append_revision(
        &self,
        chain_id: ChainId,
        value: RevisionValue,
        timestamp: Timestamp,
        actor: &ActorId,
        time_provider: &SafeTimeProvider,
    ) -> Result<RevisionReceipt> {
        debug!(chain = %chain_id, at = %timestamp, "appending revision");
        if value.kind() != chain_id.kind {
            return Err(LedgerError::InvalidConfiguration {
                message: format!("{:?} value cannot go on chain {}", value.kind(), chain_id),
            });
        }

        let _guard = self
            .locks
            .acquire(&[chain_id.loan_id], self.config.lock_timeout())?;
        let mut loan = self.store.load_loan(chain_id.loan_id)?;

        let (previous, chain_version) = match value {
            RevisionValue::InterestRate(term) => {
                let previous = loan.interest_rate_chain.head().entry_timestamp();
                loan.interest_rate_chain.append(term, timestamp)?;
                (Some(previous), loan.interest_rate_chain.version())
            }
            RevisionValue::PaymentFrequency(term) => {
                let previous = loan.payment_frequency_chain.head().entry_timestamp();
                loan.payment_frequency_chain.append(term, timestamp)?;
                (Some(previous), loan.payment_frequency_chain.version())
            }
            RevisionValue::Note(note) => match loan.notes_chain.as_mut() {
                Some(chain) => {
                    let previous = chain.head().entry_timestamp();
                    chain.append(note, timestamp)?;
                    (Some(previous), chain.version())
                }
                None => {
                    let chain = RevisionChain::new(note, timestamp);
                    let version = chain.version();
                    loan.notes_chain = Some(chain);
                    (None, version)
                }
            },
        };

        let rate_changed = chain_id.kind == ChainKind::InterestRate;
        if rate_changed {
            let transactions = self
                .store
                .transactions_for(&TransactionAddress::Loan(loan.id))?;
            loan.aggregates = self.recalculator.recompute_full_loan(&loan, &transactions)?;
        }

        let mut unit = UnitOfWork::new();
        unit.stage(Change::UpdateLoan(loan.clone()));
        self.store.commit(unit)?;
        if rate_changed {
            self.cache.invalidate_loan(loan.id);
        }

        info!(chain = %chain_id, at = %timestamp, version = chain_version, "revision appended");
        let now = entry_timestamp(time_provider);
        self.emit(Event::RevisionAppended {
            chain_id,
            effective_at: timestamp,
            chain_version,
            actor: actor.clone(),
            entry_timestamp: now,
        });
        if rate_changed {
            self.emit(Event::AggregatesRecomputed {
                entity_id: loan.id,
                kind: EntityKind::Loan,
                actor: actor.clone(),
                entry_timestamp: now,
            });
        }

        Ok(RevisionReceipt {
            chain_id,
            entry_timestamp: timestamp,
            previous,
            chain_version,
        })
    }

    /// amortization schedule over [from, to), served from cache when the
    /// rate chain and the loan's transactions are unchanged
    pub fn compute_amortization_schedule(
        &self,
        loan_id: LoanId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<AmortizationSchedule> {
        if to <= from {
            return Err(LedgerError::InvalidRange { from, to });
        }
        let loan = self.store.load_loan(loan_id)?;
        let key = ScheduleKey {
            loan_id,
            from,
            to,
            chain_version: loan.interest_rate_chain.version(),
            loan_version: loan.version,
        };
        if let Some(schedule) = self.cache.get(&key) {
            return Ok(schedule);
        }

        let transactions = self.store.transactions_for(&TransactionAddress::Loan(loan_id))?;
        let payments = AggregateRecalculator::principal_payments(&loan, &transactions);
        let schedule = self
            .recalculator
            .engine()
            .compute_schedule(&loan, from, to, &payments)?;
        self.cache.insert(key, schedule.clone());
        Ok(schedule)
    }

    /// apply a transaction, stamping its entry time from the provider
    pub fn apply_transaction(
        &self,
        input: TransactionInput,
        actor: &ActorId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Transaction> {
        let now = entry_timestamp(time_provider);
        let transaction_id = input.id;
        let processor = LedgerTransactionProcessor::new(
            &self.store,
            &self.locks,
            self.recalculator,
            &self.config,
        );

        match processor.apply(input, now) {
            Ok(applied) => {
                let tx = applied.transaction;
                for address in [tx.from(), tx.to()] {
                    if let TransactionAddress::Loan(id) = address {
                        self.cache.invalidate_loan(*id);
                    }
                }
                self.emit(Event::TransactionApplied {
                    transaction_id: tx.id(),
                    from: *tx.from(),
                    to: *tx.to(),
                    amount: tx.amount(),
                    is_refund: tx.is_refund(),
                    actor: actor.clone(),
                    entry_timestamp: now,
                });
                Ok(tx)
            }
            Err(e) if e.is_fatal() => {
                error!(transaction = %transaction_id, error = %e, "integrity violation");
                self.emit(Event::IntegrityViolation {
                    entity_id: None,
                    message: e.to_string(),
                    actor: actor.clone(),
                    entry_timestamp: now,
                });
                Err(e)
            }
            Err(e) => {
                warn!(transaction = %transaction_id, error = %e, "transaction rejected");
                self.emit(Event::TransactionRejected {
                    transaction_id,
                    reason: e.to_string(),
                    actor: actor.clone(),
                    entry_timestamp: now,
                });
                Err(e)
            }
        }
    }

    /// apply a transaction with system time
    pub fn apply_transaction_now(&self, input: TransactionInput, actor: &ActorId) -> Result<Transaction> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.apply_transaction(input, actor, &time)
    }

    /// stored aggregates of a loan, budget or interest bucket
    pub fn get_aggregates(&self, entity_id: Uuid) -> Result<EntityAggregates> {
        if let Some(loan) = found(self.store.load_loan(entity_id))? {
            return Ok(EntityAggregates::Loan {
                id: loan.id,
                aggregates: loan.aggregates,
            });
        }
        if let Some(budget) = found(self.store.load_budget(entity_id))? {
            return Ok(EntityAggregates::Budget {
                id: budget.id,
                aggregates: budget.aggregates,
            });
        }
        if let Some(bucket) = found(self.store.load_bucket(entity_id))? {
            return Ok(EntityAggregates::InterestBucket {
                id: bucket.id,
                aggregates: bucket.aggregates,
            });
        }
        Err(LedgerError::not_found("entity", entity_id))
    }

    /// replay an entity's history from scratch and check it against what is
    /// stored; a mismatch is reported, never repaired
    pub fn recompute_aggregates(
        &self,
        entity_id: Uuid,
        actor: &ActorId,
        time_provider: &SafeTimeProvider,
    ) -> Result<EntityAggregates> {
        let _guard = self.locks.acquire(&[entity_id], self.config.lock_timeout())?;
        let stored = self.get_aggregates(entity_id)?;

        let recomputed = match stored {
            EntityAggregates::Loan { id, .. } => {
                let loan = self.store.load_loan(id)?;
                let transactions = self.store.transactions_for(&TransactionAddress::Loan(id))?;
                EntityAggregates::Loan {
                    id,
                    aggregates: self.recalculator.recompute_full_loan(&loan, &transactions)?,
                }
            }
            EntityAggregates::Budget { id, .. } => {
                let budget = self.store.load_budget(id)?;
                let funded = self.store.loans_funded_by(id)?;
                let transactions = self.store.transactions_for(&TransactionAddress::Budget(id))?;
                EntityAggregates::Budget {
                    id,
                    aggregates: self
                        .recalculator
                        .recompute_full_budget(&budget, &funded, &transactions)?,
                }
            }
            EntityAggregates::InterestBucket { id, .. } => {
                let bucket = self.store.load_bucket(id)?;
                let transactions = self
                    .store
                    .transactions_for(&TransactionAddress::InterestBucket(id))?;
                EntityAggregates::InterestBucket {
                    id,
                    aggregates: self.recalculator.recompute_full_bucket(&bucket, &transactions)?,
                }
            }
        };

        let now = entry_timestamp(time_provider);
        if let Err(e) = ensure_agreement("stored aggregates", &recomputed, &stored) {
            error!(entity = %entity_id, error = %e, "stored aggregates diverged from history");
            self.emit(Event::IntegrityViolation {
                entity_id: Some(entity_id),
                message: e.to_string(),
                actor: actor.clone(),
                entry_timestamp: now,
            });
            return Err(e);
        }

        self.emit(Event::AggregatesRecomputed {
            entity_id,
            kind: recomputed.kind(),
            actor: actor.clone(),
            entry_timestamp: now,
        });
        Ok(recomputed)
    }

    /// interest charged from the loan's start until now, capped at close
    pub fn accrued_interest_to_date(
        &self,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        let loan = self.store.load_loan(loan_id)?;
        let end = entry_timestamp(time_provider).min(loan.closes_at);
        if end <= loan.started_on {
            return Ok(Money::ZERO);
        }
        Ok(self
            .compute_amortization_schedule(loan_id, loan.started_on, end)?
            .total_interest)
    }

    /// accrued interest with system time
    pub fn accrued_interest_now(&self, loan_id: LoanId) -> Result<Money> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.accrued_interest_to_date(loan_id, &time)
    }

    /// due dates in (from, to] under the frequency in force at each step
    pub fn expected_payment_dates(
        &self,
        loan_id: LoanId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Timestamp>> {
        let loan = self.store.load_loan(loan_id)?;
        expected_payment_dates(&loan, from, to)
    }
}

fn entry_timestamp(time_provider: &SafeTimeProvider) -> Timestamp {
    Timestamp::from_datetime(time_provider.now())
}

/// NotFound becomes None, any other error propagates
fn found<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(LedgerError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DurationUnit, PaymentOccurrence};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    fn day(d: i64) -> Timestamp {
        Timestamp::from_days(d)
    }

    fn clock_at(d: i64) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.timestamp_opt(d * 86_400, 0).unwrap(),
        ))
    }

    fn actor() -> ActorId {
        "loan-officer-7".to_string()
    }

    struct World {
        ledger: LendingLedger,
        time: SafeTimeProvider,
        budget: Budget,
        bucket: InterestBucket,
        loan: Loan,
    }

    fn world(config: LedgerConfig) -> World {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter("lending_ledger_rs=debug")
            .try_init();

        let ledger = LendingLedger::in_memory(config).unwrap();
        let time = clock_at(0);
        let budget = ledger
            .open_budget(
                InterestRateTerm::percentage(dec!(5), DurationUnit::Month),
                &actor(),
                &time,
            )
            .unwrap();
        let bucket = ledger.open_interest_bucket(&actor(), &time).unwrap();
        let loan = ledger
            .open_loan(
                NewLoan {
                    initial_principal: Money::from_major(1_000),
                    started_on: day(0),
                    closes_at: day(30),
                    funding_budget: Some(budget.id),
                    interest_rate: None,
                    payment_frequency: PaymentFrequencyTerm::new(PaymentOccurrence::Monthly),
                    note: None,
                },
                &actor(),
                &time,
            )
            .unwrap();
        ledger.take_events();

        World {
            ledger,
            time,
            budget,
            bucket,
            loan,
        }
    }

    fn input(at: i64, from: TransactionAddress, to: TransactionAddress, amount: i64) -> TransactionInput {
        TransactionInput::new(Uuid::new_v4(), day(at), from, to, Money::from_major(amount))
    }

    fn loan_aggregates(w: &World) -> crate::state::LoanAggregates {
        *w.ledger.get_aggregates(w.loan.id).unwrap().as_loan().unwrap()
    }

    #[test]
    fn test_loan_takes_budget_default_rate() {
        let w = world(LedgerConfig::default());

        assert_eq!(w.loan.current_interest_rate(), &w.budget.default_interest_rate);
        assert_eq!(w.loan.funding_budget, Some(w.budget.id));
        assert_eq!(loan_aggregates(&w).calculated_charged_interest, Money::from_major(50));
    }

    #[test]
    fn test_budget_lent_tracks_funded_principal() {
        let w = world(LedgerConfig::default());
        let lent = |w: &World| {
            w.ledger
                .get_aggregates(w.budget.id)
                .unwrap()
                .as_budget()
                .unwrap()
                .calculated_lended_amount
        };
        assert_eq!(lent(&w), Money::from_major(1_000));

        w.ledger
            .apply_transaction(
                input(
                    15,
                    TransactionAddress::Loan(w.loan.id),
                    TransactionAddress::Budget(w.budget.id),
                    200,
                ),
                &actor(),
                &w.time,
            )
            .unwrap();
        assert_eq!(lent(&w), Money::from_major(800));

        w.ledger
            .open_loan(
                NewLoan {
                    initial_principal: Money::from_major(250),
                    started_on: day(5),
                    closes_at: day(60),
                    funding_budget: Some(w.budget.id),
                    interest_rate: None,
                    payment_frequency: PaymentFrequencyTerm::new(PaymentOccurrence::Monthly),
                    note: None,
                },
                &actor(),
                &w.time,
            )
            .unwrap();
        assert_eq!(lent(&w), Money::from_major(1_050));
        assert!(w.ledger.recompute_aggregates(w.budget.id, &actor(), &w.time).is_ok());
    }

    #[test]
    fn test_unfunded_loan_leaves_budget() {
        let w = world(LedgerConfig::default());
        let before = w.ledger.budget(w.budget.id).unwrap();
        w.ledger
            .open_loan(
                NewLoan {
                    initial_principal: Money::from_major(400),
                    started_on: day(0),
                    closes_at: day(30),
                    funding_budget: None,
                    interest_rate: Some(InterestRateTerm::percentage(dec!(2), DurationUnit::Month)),
                    payment_frequency: PaymentFrequencyTerm::new(PaymentOccurrence::Monthly),
                    note: None,
                },
                &actor(),
                &w.time,
            )
            .unwrap();

        assert_eq!(w.ledger.budget(w.budget.id).unwrap(), before);
    }

    #[test]
    fn test_open_loan_overflow_is_rejected() {
        let w = world(LedgerConfig::default());
        let result = w.ledger.open_loan(
            NewLoan {
                initial_principal: Money::from_decimal(crate::Decimal::from_i128_with_scale(
                    10_i128.pow(28),
                    0,
                )),
                started_on: day(0),
                closes_at: day(3_650),
                funding_budget: None,
                interest_rate: Some(InterestRateTerm::percentage(dec!(100), DurationUnit::Month)),
                payment_frequency: PaymentFrequencyTerm::new(PaymentOccurrence::Monthly),
                note: None,
            },
            &actor(),
            &w.time,
        );

        assert!(matches!(result, Err(LedgerError::Calculation { .. })));
    }

    #[test]
    fn test_open_loan_without_any_rate() {
        let w = world(LedgerConfig::default());
        let result = w.ledger.open_loan(
            NewLoan {
                initial_principal: Money::from_major(10),
                started_on: day(0),
                closes_at: day(10),
                funding_budget: None,
                interest_rate: None,
                payment_frequency: PaymentFrequencyTerm::new(PaymentOccurrence::OneTime),
                note: Some("bridge".to_string()),
            },
            &actor(),
            &w.time,
        );

        assert_eq!(result, Err(LedgerError::MissingRate { at: day(0) }));
    }

    #[test]
    fn test_single_period_schedule() {
        let w = world(LedgerConfig::default());
        let schedule = w
            .ledger
            .compute_amortization_schedule(w.loan.id, day(0), day(30))
            .unwrap();

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.intervals[0].interest, Money::from_major(50));
        assert_eq!(schedule.intervals[0].principal_payment, Money::ZERO);
    }

    #[test]
    fn test_mid_period_repayment_through_ledger() {
        let w = world(LedgerConfig::default());
        w.ledger
            .apply_transaction(
                input(
                    15,
                    TransactionAddress::Loan(w.loan.id),
                    TransactionAddress::Budget(w.budget.id),
                    200,
                ),
                &actor(),
                &w.time,
            )
            .unwrap();

        let schedule = w
            .ledger
            .compute_amortization_schedule(w.loan.id, day(0), day(30))
            .unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.intervals[0].interest, Money::from_major(25));
        assert_eq!(schedule.intervals[1].outstanding_principal, Money::from_major(800));
        assert_eq!(schedule.intervals[1].interest, Money::from_major(20));

        let aggregates = loan_aggregates(&w);
        assert_eq!(aggregates.calculated_total_paid_principal, Money::from_major(200));
        assert_eq!(aggregates.calculated_charged_interest, Money::from_major(45));
        assert_eq!(aggregates.calculated_total_paid_principal, schedule.total_principal_paid);
    }

    #[test]
    fn test_lend_and_refund_restores_budget() {
        let w = world(LedgerConfig::default());
        let before = w.ledger.get_aggregates(w.budget.id).unwrap();
        let lend = input(
            1,
            TransactionAddress::Budget(w.budget.id),
            TransactionAddress::Loan(w.loan.id),
            500,
        );
        let refund = input(2, lend.from, lend.to, 500).refund();

        w.ledger.apply_transaction(lend, &actor(), &w.time).unwrap();
        let lent = w.ledger.get_aggregates(w.budget.id).unwrap();
        assert_eq!(
            lent.as_budget().unwrap().calculated_lended_amount,
            Money::from_major(1_500)
        );

        w.ledger.apply_transaction(refund, &actor(), &w.time).unwrap();
        assert_eq!(w.ledger.get_aggregates(w.budget.id).unwrap(), before);
    }

    #[test]
    fn test_same_address_rejected_for_every_kind() {
        let w = world(LedgerConfig::default());
        for address in [
            TransactionAddress::Loan(w.loan.id),
            TransactionAddress::Budget(w.budget.id),
            TransactionAddress::InterestBucket(w.bucket.id),
            TransactionAddress::Outside,
        ] {
            let result = w
                .ledger
                .apply_transaction(input(1, address, address, 10), &actor(), &w.time);
            assert!(matches!(result, Err(LedgerError::InvalidAddressPair { .. })));
        }
        assert_eq!(w.ledger.store().transaction_count(), 0);

        let events = w.ledger.take_events();
        assert_eq!(events.len(), 4);
        assert!(events
            .iter()
            .all(|e| matches!(e, Event::TransactionRejected { .. })));
    }

    #[test]
    fn test_duplicate_rejected_without_mutation() {
        let w = world(LedgerConfig::default());
        let payment = input(
            5,
            TransactionAddress::Loan(w.loan.id),
            TransactionAddress::InterestBucket(w.bucket.id),
            30,
        );
        w.ledger
            .apply_transaction(payment.clone(), &actor(), &w.time)
            .unwrap();
        let loan_before = w.ledger.get_aggregates(w.loan.id).unwrap();
        let bucket_before = w.ledger.get_aggregates(w.bucket.id).unwrap();

        let result = w.ledger.apply_transaction(payment.clone(), &actor(), &w.time);

        assert_eq!(result, Err(LedgerError::DuplicateTransaction { id: payment.id }));
        assert_eq!(w.ledger.get_aggregates(w.loan.id).unwrap(), loan_before);
        assert_eq!(w.ledger.get_aggregates(w.bucket.id).unwrap(), bucket_before);
    }

    #[test]
    fn test_rate_revision_recomputes_and_purges_cache() {
        let w = world(LedgerConfig::default());
        let first = w
            .ledger
            .compute_amortization_schedule(w.loan.id, day(0), day(30))
            .unwrap();
        assert_eq!(first.total_interest, Money::from_major(50));

        let receipt = w
            .ledger
            .append_revision(
                ChainId::new(w.loan.id, ChainKind::InterestRate),
                RevisionValue::InterestRate(InterestRateTerm::percentage(
                    dec!(10),
                    DurationUnit::Month,
                )),
                day(15),
                &actor(),
                &w.time,
            )
            .unwrap();
        assert_eq!(receipt.previous, Some(day(0)));
        assert_eq!(receipt.chain_version, 2);

        let second = w
            .ledger
            .compute_amortization_schedule(w.loan.id, day(0), day(30))
            .unwrap();
        assert_eq!(second.total_interest, Money::from_major(75));
        assert_eq!(loan_aggregates(&w).calculated_charged_interest, Money::from_major(75));

        let events = w.ledger.take_events();
        assert!(matches!(
            &events[0],
            Event::RevisionAppended { effective_at, actor: who, .. }
                if *effective_at == day(15) && who == "loan-officer-7"
        ));
        assert!(matches!(events[1], Event::AggregatesRecomputed { kind: EntityKind::Loan, .. }));
    }

    #[test]
    fn test_out_of_order_revision_leaves_loan_unchanged() {
        let w = world(LedgerConfig::default());
        let chain = ChainId::new(w.loan.id, ChainKind::InterestRate);
        let term = InterestRateTerm::percentage(dec!(7), DurationUnit::Month);
        w.ledger
            .append_revision(chain, RevisionValue::InterestRate(term.clone()), day(10), &actor(), &w.time)
            .unwrap();
        let before = w.ledger.loan(w.loan.id).unwrap();

        let result = w.ledger.append_revision(
            chain,
            RevisionValue::InterestRate(term),
            day(10),
            &actor(),
            &w.time,
        );

        assert!(matches!(result, Err(LedgerError::OutOfOrderRevision { .. })));
        assert_eq!(w.ledger.loan(w.loan.id).unwrap(), before);
    }

    #[test]
    fn test_revision_kind_must_match_chain() {
        let w = world(LedgerConfig::default());
        let result = w.ledger.append_revision(
            ChainId::new(w.loan.id, ChainKind::PaymentFrequency),
            RevisionValue::Note("wrong chain".to_string()),
            day(3),
            &actor(),
            &w.time,
        );
        assert!(matches!(result, Err(LedgerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_notes_and_frequency_revisions() {
        let w = world(LedgerConfig::default());
        let notes = ChainId::new(w.loan.id, ChainKind::Notes);
        let receipt = w
            .ledger
            .append_revision(notes, RevisionValue::Note("signed".to_string()), day(1), &actor(), &w.time)
            .unwrap();
        assert_eq!(receipt.previous, None);
        w.ledger
            .append_revision(notes, RevisionValue::Note("amended".to_string()), day(2), &actor(), &w.time)
            .unwrap();
        w.ledger
            .append_revision(
                ChainId::new(w.loan.id, ChainKind::PaymentFrequency),
                RevisionValue::PaymentFrequency(PaymentFrequencyTerm::new(PaymentOccurrence::Weekly)),
                day(30),
                &actor(),
                &w.time,
            )
            .unwrap();

        let loan = w.ledger.loan(w.loan.id).unwrap();
        assert_eq!(loan.current_note().map(String::as_str), Some("amended"));
        assert_eq!(
            w.ledger.expected_payment_dates(w.loan.id, day(0), day(60)).unwrap(),
            vec![day(30), day(37), day(44), day(51), day(58)]
        );
        // charged interest untouched by non-rate revisions
        assert_eq!(loan.aggregates.calculated_charged_interest, Money::from_major(50));
    }

    #[test]
    fn test_cached_schedule_refreshes_after_payment() {
        let w = world(LedgerConfig::default());
        let before = w
            .ledger
            .compute_amortization_schedule(w.loan.id, day(0), day(30))
            .unwrap();
        w.ledger
            .apply_transaction(
                input(
                    10,
                    TransactionAddress::Loan(w.loan.id),
                    TransactionAddress::Budget(w.budget.id),
                    300,
                ),
                &actor(),
                &w.time,
            )
            .unwrap();
        let after = w
            .ledger
            .compute_amortization_schedule(w.loan.id, day(0), day(30))
            .unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert_eq!(after.total_principal_paid, Money::from_major(300));
    }

    #[test]
    fn test_accrued_interest_follows_clock() {
        let w = world(LedgerConfig::default());
        let time = clock_at(0);
        let control = time.test_control().unwrap();

        assert_eq!(w.ledger.accrued_interest_to_date(w.loan.id, &time).unwrap(), Money::ZERO);

        control.advance(chrono::Duration::days(15));
        assert_eq!(
            w.ledger.accrued_interest_to_date(w.loan.id, &time).unwrap(),
            Money::from_major(25)
        );

        control.advance(chrono::Duration::days(100));
        assert_eq!(
            w.ledger.accrued_interest_to_date(w.loan.id, &time).unwrap(),
            Money::from_major(50)
        );
    }

    #[test]
    fn test_transaction_entry_timestamp_from_clock() {
        let w = world(LedgerConfig::default());
        let time = clock_at(42);
        let tx = w
            .ledger
            .apply_transaction(
                input(3, TransactionAddress::Outside, TransactionAddress::Budget(w.budget.id), 10_000),
                &actor(),
                &time,
            )
            .unwrap();

        assert_eq!(tx.entry_timestamp(), day(42));
        assert_eq!(tx.timestamp(), day(3));
        let budget = w.ledger.budget(w.budget.id).unwrap();
        assert_eq!(budget.aggregates.calculated_total_amount, Money::from_major(10_000));
        assert_eq!(budget.aggregates.available_amount(), Money::from_major(9_000));
        assert!(matches!(
            w.ledger.take_events().as_slice(),
            [Event::TransactionApplied { entry_timestamp, .. }] if *entry_timestamp == day(42)
        ));
    }

    #[test]
    fn test_get_aggregates_unknown_entity() {
        let w = world(LedgerConfig::default());
        assert!(matches!(
            w.ledger.get_aggregates(Uuid::new_v4()),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_recompute_matches_stored_and_is_idempotent() {
        let w = world(LedgerConfig::bulk_import());
        for (at, amount) in [(4, 100), (9, 50), (21, 75)] {
            w.ledger
                .apply_transaction(
                    input(
                        at,
                        TransactionAddress::Loan(w.loan.id),
                        TransactionAddress::Budget(w.budget.id),
                        amount,
                    ),
                    &actor(),
                    &w.time,
                )
                .unwrap();
        }

        let first = w.ledger.recompute_aggregates(w.loan.id, &actor(), &w.time).unwrap();
        let second = w.ledger.recompute_aggregates(w.loan.id, &actor(), &w.time).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, w.ledger.get_aggregates(w.loan.id).unwrap());
        assert_eq!(
            first.as_loan().unwrap().calculated_remaining_principal,
            Money::from_major(775)
        );
        assert!(w.ledger.recompute_aggregates(w.budget.id, &actor(), &w.time).is_ok());
    }

    #[test]
    fn test_tampered_aggregates_reported_not_repaired() {
        let w = world(LedgerConfig::default());
        let mut bucket = w.ledger.interest_bucket(w.bucket.id).unwrap();
        bucket.aggregates.calculated_collected_interest = Money::from_major(1);
        let mut unit = UnitOfWork::new();
        unit.stage(Change::UpdateBucket(bucket));
        w.ledger.store().commit(unit).unwrap();

        let err = w
            .ledger
            .recompute_aggregates(w.bucket.id, &actor(), &w.time)
            .unwrap_err();

        assert!(err.is_fatal());
        let stored = w.ledger.get_aggregates(w.bucket.id).unwrap();
        assert_eq!(
            stored.as_bucket().unwrap().calculated_collected_interest,
            Money::from_major(1)
        );
        assert!(w
            .ledger
            .take_events()
            .iter()
            .any(|e| matches!(e, Event::IntegrityViolation { entity_id: Some(id), .. } if *id == w.bucket.id)));
    }
}
