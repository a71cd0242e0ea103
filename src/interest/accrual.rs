use rust_decimal::Decimal;

use crate::decimal::{Money, MONEY_DP};
use crate::errors::{LedgerError, Result};
use crate::interest::compound::{compound_interest, simple_interest};
use crate::payments::{paid_before, AmortizationInterval, AmortizationSchedule, PrincipalPayment};
use crate::state::Loan;
use crate::terms::InterestRateTerm;
use crate::types::{InterestKind, Timestamp, SECONDS_PER_DAY};

/// engine producing amortization schedules from a loan's rate history.
///
/// Pure: reads the loan and the payments it is handed, never mutates, never
/// logs. Every interval's interest is rounded to `scale` places, so schedule
/// totals are exact decimal sums whatever order they are added in.
#[derive(Debug, Clone, Copy)]
pub struct AccrualEngine {
    scale: u32,
}

impl AccrualEngine {
    pub fn new(scale: u32) -> Self {
        Self {
            scale: scale.min(MONEY_DP),
        }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// amortization schedule over [from, to).
    ///
    /// The range is cut at every rate revision and every payment inside it.
    /// Payments dated before `from` only lower the opening principal; a
    /// payment dated at an interval's start lowers that interval's principal.
    pub fn compute_schedule(
        &self,
        loan: &Loan,
        from: Timestamp,
        to: Timestamp,
        payments: &[PrincipalPayment],
    ) -> Result<AmortizationSchedule> {
        if to <= from {
            return Err(LedgerError::InvalidRange { from, to });
        }

        let chain = &loan.interest_rate_chain;
        chain
            .at(from)
            .map_err(|_| LedgerError::MissingRate { at: from })?;

        let boundaries = self.partition(loan, from, to, payments);
        let mut principal = loan.initial_principal - paid_before(payments, from);
        let mut intervals = Vec::with_capacity(boundaries.len().saturating_sub(1));

        for window in boundaries.windows(2) {
            let (start, end) = (window[0], window[1]);

            let principal_payment: Money = payments
                .iter()
                .filter(|p| p.timestamp >= start && p.timestamp < end)
                .map(|p| p.amount)
                .sum();
            principal -= principal_payment;

            let term = chain.at(start)?;
            let interest = self.interest_for(term, principal, start, end, loan.lifetime_seconds())?;

            intervals.push(AmortizationInterval {
                from_date_timestamp: start,
                to_date_timestamp: end,
                outstanding_principal: principal,
                interest,
                principal_payment,
            });
        }

        Ok(AmortizationSchedule::new(loan.id, from, to, intervals))
    }

    /// sorted cut points of [from, to), both ends included
    pub fn partition(
        &self,
        loan: &Loan,
        from: Timestamp,
        to: Timestamp,
        payments: &[PrincipalPayment],
    ) -> Vec<Timestamp> {
        let mut points = vec![from, to];
        points.extend(loan.interest_rate_chain.change_points(from, to));
        points.extend(
            payments
                .iter()
                .map(|p| p.timestamp)
                .filter(|ts| *ts > from && *ts < to),
        );
        points.sort_unstable();
        points.dedup();
        points
    }

    /// latest cut point of the loan's lifetime partition at or before `at`.
    ///
    /// Intervals ending at or before the returned point do not depend on
    /// anything dated at or after `at`.
    pub fn boundary_at_or_before(
        &self,
        loan: &Loan,
        payments: &[PrincipalPayment],
        at: Timestamp,
    ) -> Timestamp {
        if at <= loan.started_on {
            return loan.started_on;
        }

        let revisions = loan.interest_rate_chain.history().map(|(_, ts)| ts);
        let paid = payments.iter().map(|p| p.timestamp);

        revisions
            .chain(paid)
            .filter(|ts| *ts > loan.started_on && *ts <= at && *ts < loan.closes_at)
            .max()
            .unwrap_or(loan.started_on)
    }

    /// interest for one interval under one term
    pub fn interest_for(
        &self,
        term: &InterestRateTerm,
        principal: Money,
        from: Timestamp,
        to: Timestamp,
        lifetime_seconds: i64,
    ) -> Result<Money> {
        let period_seconds = match term.duration.days() {
            Some(days) => days * SECONDS_PER_DAY,
            None => lifetime_seconds,
        };
        if period_seconds <= 0 {
            return Err(LedgerError::Calculation {
                message: format!("non-positive period of {} seconds", period_seconds),
            });
        }

        let periods = Decimal::from(from.seconds_until(to))
            .checked_div(Decimal::from(period_seconds))
            .ok_or_else(|| LedgerError::Calculation {
                message: "period count overflow".to_string(),
            })?;

        let interest = match term.kind {
            InterestKind::PercentagePerDuration => {
                // an overpaid loan accrues nothing rather than negative interest
                let base = principal.max(Money::ZERO);
                if term.is_compounding {
                    compound_interest(base, term.rate(), periods).ok_or_else(|| {
                        LedgerError::Calculation {
                            message: format!("compounding overflow over {} periods", periods),
                        }
                    })?
                } else {
                    simple_interest(base, term.rate(), periods).ok_or_else(|| {
                        LedgerError::Calculation {
                            message: format!("simple interest overflow over {} periods", periods),
                        }
                    })?
                }
            }
            // flat charge per period, accrues regardless of principal
            InterestKind::FixedPerDuration => {
                term.amount
                    .checked_mul(periods)
                    .ok_or_else(|| LedgerError::Calculation {
                        message: format!("fixed charge overflow over {} periods", periods),
                    })?
            }
        };

        Ok(Money::from_decimal(interest).round_dp(self.scale))
    }
}

impl Default for AccrualEngine {
    fn default() -> Self {
        Self::new(MONEY_DP)
    }
}
