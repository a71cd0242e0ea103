use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::revision::RevisionChain;
use crate::terms::{InterestRateTerm, PaymentFrequencyTerm};
use crate::types::{BudgetId, InterestBucketId, LoanId, Timestamp};

/// derived loan totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoanAggregates {
    pub calculated_remaining_principal: Money,
    pub calculated_total_paid_principal: Money,
    pub calculated_charged_interest: Money,
    pub calculated_paid_interest: Money,
    /// net amount lent into the loan by budgets
    pub calculated_funded_amount: Money,
    /// net external cash flow, injections minus disbursements
    pub calculated_total_amount: Money,
}

impl LoanAggregates {
    /// totals before any transaction, with no interest charged yet
    pub fn opening(initial_principal: Money) -> Self {
        Self {
            calculated_remaining_principal: initial_principal,
            ..Self::default()
        }
    }

    /// interest charged but not yet paid
    pub fn outstanding_interest(&self) -> Money {
        self.calculated_charged_interest - self.calculated_paid_interest
    }
}

/// derived budget totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAggregates {
    /// capital held by the budget, lent or not
    pub calculated_total_amount: Money,
    pub calculated_lended_amount: Money,
}

impl BudgetAggregates {
    pub fn available_amount(&self) -> Money {
        self.calculated_total_amount - self.calculated_lended_amount
    }
}

/// derived interest bucket totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BucketAggregates {
    pub calculated_collected_interest: Money,
}

/// a loan with its revisioned terms and derived totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    pub initial_principal: Money,
    pub started_on: Timestamp,
    pub closes_at: Timestamp,
    pub funding_budget: Option<BudgetId>,
    pub interest_rate_chain: RevisionChain<InterestRateTerm>,
    pub payment_frequency_chain: RevisionChain<PaymentFrequencyTerm>,
    pub notes_chain: Option<RevisionChain<String>>,
    #[serde(flatten)]
    pub aggregates: LoanAggregates,
    pub version: u64,
}

impl Loan {
    /// open a loan whose terms are in force from `started_on`
    pub fn new(
        id: LoanId,
        initial_principal: Money,
        started_on: Timestamp,
        closes_at: Timestamp,
        interest_rate: InterestRateTerm,
        payment_frequency: PaymentFrequencyTerm,
    ) -> Self {
        Self {
            id,
            initial_principal,
            started_on,
            closes_at,
            funding_budget: None,
            interest_rate_chain: RevisionChain::new(interest_rate, started_on),
            payment_frequency_chain: RevisionChain::new(payment_frequency, started_on),
            notes_chain: None,
            aggregates: LoanAggregates::opening(initial_principal),
            version: 0,
        }
    }

    pub fn funded_by(mut self, budget: BudgetId) -> Self {
        self.funding_budget = Some(budget);
        self
    }

    /// seconds between start and close, the length of a FullDuration period
    pub fn lifetime_seconds(&self) -> i64 {
        self.started_on.seconds_until(self.closes_at)
    }

    pub fn current_interest_rate(&self) -> &InterestRateTerm {
        self.interest_rate_chain.current()
    }

    pub fn current_note(&self) -> Option<&String> {
        self.notes_chain.as_ref().map(|chain| chain.current())
    }

    /// remaining principal must always equal initial minus repaid
    pub fn principal_is_consistent(&self) -> bool {
        self.aggregates.calculated_remaining_principal
            == self.initial_principal - self.aggregates.calculated_total_paid_principal
    }
}

/// a pool of capital that funds loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: BudgetId,
    pub default_interest_rate: InterestRateTerm,
    #[serde(flatten)]
    pub aggregates: BudgetAggregates,
    pub version: u64,
}

impl Budget {
    pub fn new(id: BudgetId, default_interest_rate: InterestRateTerm) -> Self {
        Self {
            id,
            default_interest_rate,
            aggregates: BudgetAggregates::default(),
            version: 0,
        }
    }
}

/// collects interest paid on loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestBucket {
    pub id: InterestBucketId,
    #[serde(flatten)]
    pub aggregates: BucketAggregates,
    pub version: u64,
}

impl InterestBucket {
    pub fn new(id: InterestBucketId) -> Self {
        Self {
            id,
            aggregates: BucketAggregates::default(),
            version: 0,
        }
    }
}
