use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::types::{ChainKind, DurationUnit, InterestKind, PaymentCadence, PaymentOccurrence};

/// interest terms in force from a revision's entry timestamp onwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRateTerm {
    pub kind: InterestKind,
    pub duration: DurationUnit,
    pub expected_payment_cadence: PaymentCadence,
    /// percent for PercentagePerDuration, money for FixedPerDuration
    pub amount: Decimal,
    pub is_compounding: bool,
}

impl InterestRateTerm {
    /// simple percentage of principal per duration, paid monthly
    pub fn percentage(amount: Decimal, duration: DurationUnit) -> Self {
        Self {
            kind: InterestKind::PercentagePerDuration,
            duration,
            expected_payment_cadence: PaymentCadence::Monthly,
            amount,
            is_compounding: false,
        }
    }

    /// flat amount per duration
    pub fn fixed(amount: Decimal, duration: DurationUnit) -> Self {
        Self {
            kind: InterestKind::FixedPerDuration,
            duration,
            expected_payment_cadence: PaymentCadence::Monthly,
            amount,
            is_compounding: false,
        }
    }

    pub fn compounding(mut self) -> Self {
        self.is_compounding = true;
        self
    }

    pub fn with_cadence(mut self, cadence: PaymentCadence) -> Self {
        self.expected_payment_cadence = cadence;
        self
    }

    /// rate per duration for percentage terms
    pub fn rate(&self) -> Rate {
        Rate::from_percent(self.amount)
    }
}

/// expected principal payment rhythm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFrequencyTerm {
    pub occurrence: PaymentOccurrence,
    pub is_strict: bool,
    /// 1..=31, only meaningful for strict terms
    pub strict_day_of_month: Option<u8>,
}

impl PaymentFrequencyTerm {
    pub fn new(occurrence: PaymentOccurrence) -> Self {
        Self {
            occurrence,
            is_strict: false,
            strict_day_of_month: None,
        }
    }

    /// pin calendar-month occurrences to a day of the month
    pub fn strict_on(mut self, day_of_month: u8) -> Self {
        self.is_strict = true;
        self.strict_day_of_month = Some(day_of_month.clamp(1, 31));
        self
    }
}

/// a value appended to one of a loan's revision chains
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionValue {
    InterestRate(InterestRateTerm),
    PaymentFrequency(PaymentFrequencyTerm),
    Note(String),
}

impl RevisionValue {
    pub fn kind(&self) -> ChainKind {
        match self {
            RevisionValue::InterestRate(_) => ChainKind::InterestRate,
            RevisionValue::PaymentFrequency(_) => ChainKind::PaymentFrequency,
            RevisionValue::Note(_) => ChainKind::Notes,
        }
    }
}
