//! Running-balance checks over a parsed statement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{ParseResult, Sign};

/// A transaction whose printed balance disagrees with `previous ± amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceMismatch {
    /// Position in `ParseResult::transactions`.
    pub index: usize,
    pub date: NaiveDate,
    pub description: String,
    /// Signed amount (debits negative).
    pub amount: Decimal,
    pub previous_balance: Decimal,
    pub expected_balance: Decimal,
    pub provided_balance: Decimal,
    /// `provided - expected`.
    pub delta: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub mismatches: Vec<BalanceMismatch>,
    /// `closing_balance - last running balance`, when both are known and differ.
    pub closing_delta: Option<Decimal>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.closing_delta.is_none()
    }
}

/// Walk the transactions in document order, chaining from the opening balance.
///
/// Rows without a running balance are skipped; rows with an unknown sign
/// only move the chain forward.
pub fn balance_mismatches(result: &ParseResult, tolerance: Decimal) -> Vec<BalanceMismatch> {
    let mut previous = result.account.opening_balance;
    let mut out = Vec::new();

    for (index, txn) in result.transactions.iter().enumerate() {
        let Some(provided) = txn.running_balance else {
            continue;
        };

        if let Some(prev) = previous.filter(|_| txn.amount.sign != Sign::Unknown) {
            let amount = txn.amount.signed();
            let expected = (prev + amount).round_dp(2);
            let delta = provided.round_dp(2) - expected;
            if delta.abs() > tolerance {
                out.push(BalanceMismatch {
                    index,
                    date: txn.date,
                    description: txn.description.clone(),
                    amount,
                    previous_balance: prev,
                    expected_balance: expected,
                    provided_balance: provided,
                    delta,
                });
            }
        }
        previous = Some(provided);
    }

    out
}

pub fn reconcile(result: &ParseResult, tolerance: Decimal) -> ReconcileReport {
    let last = result.transactions.iter().rev().find_map(|t| t.running_balance);
    let closing_delta = match (result.account.closing_balance, last) {
        (Some(closing), Some(last)) => Some(closing - last).filter(|d| d.abs() > tolerance),
        _ => None,
    };

    ReconcileReport {
        mismatches: balance_mismatches(result, tolerance),
        closing_delta,
    }
}
