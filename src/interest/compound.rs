use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};

/// growth factor for `periods` periods at `rate` per period.
///
/// Whole periods compound exactly by repeated multiplication; a trailing
/// partial period accrues simply on the compounded balance, so the result
/// stays in exact decimal arithmetic. None on decimal overflow.
pub fn compound_growth(rate: Rate, periods: Decimal) -> Option<Decimal> {
    if periods <= Decimal::ZERO {
        return Some(Decimal::ONE);
    }

    let whole = periods.trunc();
    let partial = periods - whole;

    let partial_factor = rate
        .as_decimal()
        .checked_mul(partial)?
        .checked_add(Decimal::ONE)?;
    rate.growth_factor(whole.to_u32()?)?
        .checked_mul(partial_factor)
}

/// interest earned on `principal` over `periods`, growth minus principal
pub fn compound_interest(principal: Money, rate: Rate, periods: Decimal) -> Option<Decimal> {
    principal
        .as_decimal()
        .checked_mul(compound_growth(rate, periods)? - Decimal::ONE)
}

/// interest without compounding, None on decimal overflow
pub fn simple_interest(principal: Money, rate: Rate, periods: Decimal) -> Option<Decimal> {
    principal
        .as_decimal()
        .checked_mul(rate.as_decimal())?
        .checked_mul(periods)
}
