use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a budget
pub type BudgetId = Uuid;

/// unique identifier for an interest bucket
pub type InterestBucketId = Uuid;

/// unique identifier for a ledger transaction
pub type TransactionId = Uuid;

/// identity of the caller, used for audit attribution only
pub type ActorId = String;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// point in time as integer seconds since the unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_secs(secs: i64) -> Self {
        Timestamp(secs)
    }

    pub const fn from_days(days: i64) -> Self {
        Timestamp(days * SECONDS_PER_DAY)
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.timestamp())
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// None when outside chrono's representable range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }

    /// signed seconds from self to other
    pub fn seconds_until(&self, other: Timestamp) -> i64 {
        other.0 - self.0
    }

    pub fn plus_days(&self, days: i64) -> Timestamp {
        Timestamp(self.0 + days * SECONDS_PER_DAY)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// how an interest term's amount is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterestKind {
    /// amount is a percentage of outstanding principal per duration
    PercentagePerDuration,
    /// amount is a flat sum per duration, independent of principal
    FixedPerDuration,
}

/// time granularity an interest term is expressed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DurationUnit {
    Day,
    Week,
    Month,
    Year,
    /// one period spans the whole loan, start to close
    FullDuration,
}

impl DurationUnit {
    /// simplified day count; None for FullDuration which depends on the loan
    pub fn days(&self) -> Option<i64> {
        match self {
            DurationUnit::Day => Some(1),
            DurationUnit::Week => Some(7),
            DurationUnit::Month => Some(30),
            DurationUnit::Year => Some(365),
            DurationUnit::FullDuration => None,
        }
    }
}

/// cadence at which interest is expected to be paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentCadence {
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// how often principal payments are expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentOccurrence {
    OneTime,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl PaymentOccurrence {
    /// step in days; None for OneTime
    pub fn days(&self) -> Option<i64> {
        match self {
            PaymentOccurrence::OneTime => None,
            PaymentOccurrence::Daily => Some(1),
            PaymentOccurrence::Weekly => Some(7),
            PaymentOccurrence::Biweekly => Some(14),
            PaymentOccurrence::Monthly => Some(30),
            PaymentOccurrence::Quarterly => Some(90),
            PaymentOccurrence::Yearly => Some(365),
        }
    }

    /// step in calendar months for strict day-of-month terms
    pub fn months(&self) -> Option<u32> {
        match self {
            PaymentOccurrence::Monthly => Some(1),
            PaymentOccurrence::Quarterly => Some(3),
            PaymentOccurrence::Yearly => Some(12),
            _ => None,
        }
    }
}

/// which of a loan's revision chains a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainKind {
    InterestRate,
    PaymentFrequency,
    Notes,
}

/// stable address of a revision chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId {
    pub loan_id: LoanId,
    pub kind: ChainKind,
}

impl ChainId {
    pub fn new(loan_id: LoanId, kind: ChainKind) -> Self {
        Self { loan_id, kind }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} chain of loan {}", self.kind, self.loan_id)
    }
}
