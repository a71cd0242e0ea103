use chrono::{Datelike, Months, NaiveDate};

use crate::errors::{LedgerError, Result};
use crate::state::Loan;
use crate::terms::PaymentFrequencyTerm;
use crate::types::Timestamp;

/// expected principal due dates in (from, to], stepping from the loan start
/// with whichever payment frequency is in force at each step
pub fn expected_payment_dates(loan: &Loan, from: Timestamp, to: Timestamp) -> Result<Vec<Timestamp>> {
    if to <= from {
        return Err(LedgerError::InvalidRange { from, to });
    }

    let chain = &loan.payment_frequency_chain;
    let mut dates = Vec::new();
    let mut cursor = loan.started_on;

    while cursor < to {
        let term = chain.at(cursor)?;
        let next = match next_due(term, cursor) {
            Some(next) => next,
            None => {
                // one-time principal falls due at close
                if loan.closes_at > from && loan.closes_at <= to {
                    dates.push(loan.closes_at);
                }
                break;
            }
        };

        if next > from && next <= to {
            dates.push(next);
        }
        cursor = next;
    }

    Ok(dates)
}

/// due date following `cursor`, None for one-time terms
fn next_due(term: &PaymentFrequencyTerm, cursor: Timestamp) -> Option<Timestamp> {
    match (term.is_strict, term.strict_day_of_month, term.occurrence.months()) {
        (true, Some(day), Some(months)) => strict_next(cursor, months, day),
        _ => term.occurrence.days().map(|days| cursor.plus_days(days)),
    }
}

/// the due day in the cursor's own month when it is still ahead, otherwise
/// the same day `months` calendar months on; clamped to month end
fn strict_next(cursor: Timestamp, months: u32, day: u8) -> Option<Timestamp> {
    let month_start = cursor.to_datetime()?.date_naive().with_day(1)?;
    let this_month = due_in(month_start, day)?;
    if this_month > cursor {
        return Some(this_month);
    }
    due_in(month_start.checked_add_months(Months::new(months))?, day)
}

fn due_in(month_start: NaiveDate, day: u8) -> Option<Timestamp> {
    let due = month_start.with_day(u32::from(day).min(days_in_month(month_start)?))?;
    Some(Timestamp::from_datetime(due.and_hms_opt(0, 0, 0)?.and_utc()))
}

fn days_in_month(month_start: NaiveDate) -> Option<u32> {
    month_start
        .checked_add_months(Months::new(1))?
        .pred_opt()
        .map(|last| last.day())
}
