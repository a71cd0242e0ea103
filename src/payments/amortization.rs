use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{LoanId, Timestamp};

/// one computed sub-period of a loan's life
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationInterval {
    pub from_date_timestamp: Timestamp,
    pub to_date_timestamp: Timestamp,
    /// principal the interval's interest accrues on
    pub outstanding_principal: Money,
    pub interest: Money,
    /// signed principal movement dated inside the interval
    pub principal_payment: Money,
}

/// ordered intervals over a range with their totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    pub loan_id: LoanId,
    pub from: Timestamp,
    pub to: Timestamp,
    pub intervals: Vec<AmortizationInterval>,
    pub total_interest: Money,
    pub total_principal_paid: Money,
}

impl AmortizationSchedule {
    pub fn new(loan_id: LoanId, from: Timestamp, to: Timestamp, intervals: Vec<AmortizationInterval>) -> Self {
        let total_interest = intervals.iter().map(|i| i.interest).sum();
        let total_principal_paid = intervals.iter().map(|i| i.principal_payment).sum();

        Self {
            loan_id,
            from,
            to,
            intervals,
            total_interest,
            total_principal_paid,
        }
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// interval covering `at`, if any
    pub fn interval_at(&self, at: Timestamp) -> Option<&AmortizationInterval> {
        self.intervals
            .iter()
            .find(|i| i.from_date_timestamp <= at && at < i.to_date_timestamp)
    }

    /// principal outstanding at the end of the schedule
    pub fn closing_principal(&self) -> Option<Money> {
        self.intervals.last().map(|i| i.outstanding_principal)
    }

    /// interest of intervals starting at or after `at`
    pub fn interest_from(&self, at: Timestamp) -> Money {
        self.intervals
            .iter()
            .filter(|i| i.from_date_timestamp >= at)
            .map(|i| i.interest)
            .sum()
    }
}
