pub mod amortization;
pub mod frequency;

use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::Timestamp;

pub use amortization::{AmortizationInterval, AmortizationSchedule};
pub use frequency::expected_payment_dates;

/// a principal-reducing movement; negative for a refunded repayment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPayment {
    pub timestamp: Timestamp,
    pub amount: Money,
}

impl PrincipalPayment {
    pub fn new(timestamp: Timestamp, amount: Money) -> Self {
        Self { timestamp, amount }
    }
}

/// signed total of payments dated strictly before `at`
pub fn paid_before(payments: &[PrincipalPayment], at: Timestamp) -> Money {
    payments
        .iter()
        .filter(|p| p.timestamp < at)
        .map(|p| p.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_before_is_signed_and_exclusive() {
        let payments = vec![
            PrincipalPayment::new(Timestamp::from_days(1), Money::from_major(100)),
            PrincipalPayment::new(Timestamp::from_days(2), Money::from_major(-40)),
            PrincipalPayment::new(Timestamp::from_days(3), Money::from_major(500)),
        ];

        assert_eq!(paid_before(&payments, Timestamp::from_days(3)), Money::from_major(60));
        assert_eq!(paid_before(&payments, Timestamp::from_days(1)), Money::ZERO);
    }
}
