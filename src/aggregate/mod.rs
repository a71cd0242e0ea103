pub mod recalculator;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::EntityKind;
use crate::state::{BucketAggregates, BudgetAggregates, LoanAggregates};

pub use recalculator::{ensure_agreement, AggregateRecalculator};

/// aggregates of any ledger entity, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntityAggregates {
    Loan { id: Uuid, aggregates: LoanAggregates },
    Budget { id: Uuid, aggregates: BudgetAggregates },
    InterestBucket { id: Uuid, aggregates: BucketAggregates },
}

impl EntityAggregates {
    pub fn id(&self) -> Uuid {
        match self {
            EntityAggregates::Loan { id, .. }
            | EntityAggregates::Budget { id, .. }
            | EntityAggregates::InterestBucket { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityAggregates::Loan { .. } => EntityKind::Loan,
            EntityAggregates::Budget { .. } => EntityKind::Budget,
            EntityAggregates::InterestBucket { .. } => EntityKind::InterestBucket,
        }
    }

    pub fn as_loan(&self) -> Option<&LoanAggregates> {
        match self {
            EntityAggregates::Loan { aggregates, .. } => Some(aggregates),
            _ => None,
        }
    }

    pub fn as_budget(&self) -> Option<&BudgetAggregates> {
        match self {
            EntityAggregates::Budget { aggregates, .. } => Some(aggregates),
            _ => None,
        }
    }

    pub fn as_bucket(&self) -> Option<&BucketAggregates> {
        match self {
            EntityAggregates::InterestBucket { aggregates, .. } => Some(aggregates),
            _ => None,
        }
    }
}
