/// serializable views for the transport/query layer
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::EntityAggregates;
use crate::decimal::Money;
use crate::events::EntityKind;
use crate::payments::{AmortizationInterval, AmortizationSchedule};
use crate::state::{Budget, Loan, LoanAggregates};
use crate::terms::InterestRateTerm;
use crate::types::{BudgetId, LoanId, Timestamp};

/// aggregate fields of one entity, flattened for queries
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesView {
    pub entity_id: Uuid,
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_total_paid_principal: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_charged_interest: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_paid_interest: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_remaining_principal: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_lended_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_available_amount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_collected_interest: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_total_amount: Option<Money>,
}

impl AggregatesView {
    pub fn from_aggregates(aggregates: &EntityAggregates) -> Self {
        let mut view = AggregatesView {
            entity_id: aggregates.id(),
            kind: aggregates.kind(),
            calculated_total_paid_principal: None,
            calculated_charged_interest: None,
            calculated_paid_interest: None,
            calculated_remaining_principal: None,
            calculated_lended_amount: None,
            calculated_available_amount: None,
            calculated_collected_interest: None,
            calculated_total_amount: None,
        };

        match aggregates {
            EntityAggregates::Loan { aggregates: a, .. } => {
                view.calculated_total_paid_principal = Some(a.calculated_total_paid_principal);
                view.calculated_charged_interest = Some(a.calculated_charged_interest);
                view.calculated_paid_interest = Some(a.calculated_paid_interest);
                view.calculated_remaining_principal = Some(a.calculated_remaining_principal);
                view.calculated_total_amount = Some(a.calculated_total_amount);
            }
            EntityAggregates::Budget { aggregates: a, .. } => {
                view.calculated_lended_amount = Some(a.calculated_lended_amount);
                view.calculated_available_amount = Some(a.available_amount());
                view.calculated_total_amount = Some(a.calculated_total_amount);
            }
            EntityAggregates::InterestBucket { aggregates: a, .. } => {
                view.calculated_collected_interest = Some(a.calculated_collected_interest);
            }
        }
        view
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// loan summary with the terms currently in force
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanView {
    pub id: LoanId,
    pub initial_principal: Money,
    pub started_on: Option<DateTime<Utc>>,
    pub closes_at: Option<DateTime<Utc>>,
    pub funding_budget: Option<BudgetId>,
    pub current_interest_rate: InterestRateTerm,
    pub rate_revisions: usize,
    pub current_note: Option<String>,
    pub outstanding_interest: Money,
    pub aggregates: LoanAggregates,
}

impl LoanView {
    pub fn from_loan(loan: &Loan) -> Self {
        LoanView {
            id: loan.id,
            initial_principal: loan.initial_principal,
            started_on: loan.started_on.to_datetime(),
            closes_at: loan.closes_at.to_datetime(),
            funding_budget: loan.funding_budget,
            current_interest_rate: loan.current_interest_rate().clone(),
            rate_revisions: loan.interest_rate_chain.len(),
            current_note: loan.current_note().cloned(),
            outstanding_interest: loan.aggregates.outstanding_interest(),
            aggregates: loan.aggregates,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetView {
    pub id: BudgetId,
    pub default_interest_rate: InterestRateTerm,
    pub total_amount: Money,
    pub lended_amount: Money,
    pub available_amount: Money,
}

impl BudgetView {
    pub fn from_budget(budget: &Budget) -> Self {
        BudgetView {
            id: budget.id,
            default_interest_rate: budget.default_interest_rate.clone(),
            total_amount: budget.aggregates.calculated_total_amount,
            lended_amount: budget.aggregates.calculated_lended_amount,
            available_amount: budget.aggregates.available_amount(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalView {
    pub from_date_timestamp: Timestamp,
    pub to_date_timestamp: Timestamp,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub outstanding_principal: Money,
    pub interest: Money,
    pub principal_payment: Money,
}

impl From<&AmortizationInterval> for IntervalView {
    fn from(interval: &AmortizationInterval) -> Self {
        IntervalView {
            from_date_timestamp: interval.from_date_timestamp,
            to_date_timestamp: interval.to_date_timestamp,
            from_date: interval.from_date_timestamp.to_datetime(),
            to_date: interval.to_date_timestamp.to_datetime(),
            outstanding_principal: interval.outstanding_principal,
            interest: interval.interest,
            principal_payment: interval.principal_payment,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub loan_id: LoanId,
    pub intervals: Vec<IntervalView>,
    pub total_interest: Money,
    pub total_principal_paid: Money,
}

impl ScheduleView {
    pub fn from_schedule(schedule: &AmortizationSchedule) -> Self {
        ScheduleView {
            loan_id: schedule.loan_id,
            intervals: schedule.intervals.iter().map(IntervalView::from).collect(),
            total_interest: schedule.total_interest,
            total_principal_paid: schedule.total_principal_paid,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
