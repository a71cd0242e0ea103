use crate::errors::{LedgerError, Result};
use crate::ledger::address::TransactionAddress;
use crate::types::{BudgetId, InterestBucketId, LoanId};

/// what a transaction does to the entities on either end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// budget lends capital into a loan
    Lend { budget: BudgetId, loan: LoanId },
    /// borrower repays principal back to a budget
    RepayPrincipal { loan: LoanId, budget: BudgetId },
    /// borrower pays interest into a bucket
    PayInterest {
        loan: LoanId,
        bucket: InterestBucketId,
    },
    FundLoan { loan: LoanId },
    FundBudget { budget: BudgetId },
    DisburseLoan { loan: LoanId },
    WithdrawBudget { budget: BudgetId },
}

impl Effect {
    /// the loan whose principal this effect repays, if any
    pub fn repaid_loan(&self) -> Option<LoanId> {
        match self {
            Effect::RepayPrincipal { loan, .. } => Some(*loan),
            _ => None,
        }
    }
}

/// map an address pair to its effect; unsupported pairs are rejected
pub fn route(from: &TransactionAddress, to: &TransactionAddress) -> Result<Effect> {
    use TransactionAddress::*;

    let effect = match (*from, *to) {
        (Budget(budget), Loan(loan)) => Some(Effect::Lend { budget, loan }),
        (Loan(loan), Budget(budget)) => Some(Effect::RepayPrincipal { loan, budget }),
        (Loan(loan), InterestBucket(bucket)) => Some(Effect::PayInterest { loan, bucket }),
        (Outside, Loan(loan)) => Some(Effect::FundLoan { loan }),
        (Outside, Budget(budget)) => Some(Effect::FundBudget { budget }),
        (Loan(loan), Outside) => Some(Effect::DisburseLoan { loan }),
        (Budget(budget), Outside) => Some(Effect::WithdrawBudget { budget }),

        (Budget(_), Budget(_))
        | (Budget(_), InterestBucket(_))
        | (Loan(_), Loan(_))
        | (InterestBucket(_), _)
        | (Outside, InterestBucket(_))
        | (Outside, Outside) => None,
    };

    effect.ok_or_else(|| LedgerError::InvalidAddressPair {
        from: from.to_string(),
        to: to.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_supported_pairs() {
        let (budget, loan, bucket) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        use TransactionAddress::*;

        assert_eq!(route(&Budget(budget), &Loan(loan)).unwrap(), Effect::Lend { budget, loan });
        assert_eq!(
            route(&Loan(loan), &Budget(budget)).unwrap(),
            Effect::RepayPrincipal { loan, budget }
        );
        assert_eq!(
            route(&Loan(loan), &InterestBucket(bucket)).unwrap(),
            Effect::PayInterest { loan, bucket }
        );
        assert_eq!(route(&Outside, &Budget(budget)).unwrap(), Effect::FundBudget { budget });
        assert_eq!(route(&Loan(loan), &Outside).unwrap(), Effect::DisburseLoan { loan });
        assert_eq!(
            route(&Loan(loan), &Budget(budget)).unwrap().repaid_loan(),
            Some(loan)
        );
    }

    #[test]
    fn test_rejected_pairs() {
        let (budget, loan, bucket) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        use TransactionAddress::*;

        for (from, to) in [
            (Budget(budget), Budget(budget)),
            (Loan(loan), Loan(loan)),
            (Outside, Outside),
            (InterestBucket(bucket), Loan(loan)),
            (InterestBucket(bucket), Outside),
            (Outside, InterestBucket(bucket)),
            (Budget(budget), InterestBucket(bucket)),
        ] {
            assert!(
                matches!(route(&from, &to), Err(LedgerError::InvalidAddressPair { .. })),
                "{} -> {} should be rejected",
                from,
                to
            );
        }
    }
}
