//! Builds `Transaction` records from ledger rows and their continuation lines.

use rust_decimal::Decimal;

use crate::classify::TransactionLine;
use crate::config::ParserConfig;
use crate::extractors::AmountToken;
use crate::hints::DocumentHints;
use crate::types::{ParsedAmount, RawLine, Sign, Transaction, UnparsedReason};

pub struct Assembler<'a> {
    config: &'a ParserConfig,
    hints: &'a DocumentHints,
    open: Option<Transaction>,
    continuations: usize,
    last_balance: Option<Decimal>,
    done: Vec<Transaction>,
}

/// Amount and running balance from the amount columns of a row.
///
/// Three columns are withdrawal / deposit / balance; a zero in one of the
/// first two tells which side the other is on.
fn split_columns(amounts: &[AmountToken]) -> Option<(ParsedAmount, Option<Decimal>)> {
    match amounts {
        [amount] => Some((amount.amount.clone(), None)),
        [amount, balance] => Some((amount.amount.clone(), Some(balance.amount.signed()))),
        [withdrawal, deposit, balance] => {
            let mut amount = match (withdrawal.amount.is_zero(), deposit.amount.is_zero()) {
                (true, false) => with_default_sign(&deposit.amount, Sign::Credit),
                (false, true) => with_default_sign(&withdrawal.amount, Sign::Debit),
                _ => withdrawal.amount.clone(),
            };
            if amount.currency.is_none() {
                amount.currency = balance.amount.currency.clone();
            }
            Some((amount, Some(balance.amount.signed())))
        }
        _ => None,
    }
}

fn with_default_sign(amount: &ParsedAmount, sign: Sign) -> ParsedAmount {
    let mut out = amount.clone();
    if out.sign == Sign::Unknown {
        out.sign = sign;
    }
    out
}

impl<'a> Assembler<'a> {
    pub fn new(config: &'a ParserConfig, hints: &'a DocumentHints) -> Self {
        Self {
            config,
            hints,
            open: None,
            continuations: 0,
            last_balance: None,
            done: Vec::new(),
        }
    }

    /// Seed the previous balance, e.g. from an opening or brought-forward line.
    pub fn anchor_balance(&mut self, balance: Decimal) {
        self.last_balance = Some(balance);
    }

    /// Start a new transaction from a ledger row.
    ///
    /// Fails only when the row's date cannot be placed on a calendar.
    pub fn push_transaction(&mut self, line: &RawLine, row: &TransactionLine) -> Result<(), UnparsedReason> {
        let date = self.hints.resolve(&row.date).ok_or(UnparsedReason::UnrecognizedFormat)?;
        let post_date = row.post_date.and_then(|d| self.hints.resolve(&d));
        let (mut amount, running_balance) =
            split_columns(&row.amounts).ok_or(UnparsedReason::AmbiguousClassification)?;

        if amount.sign == Sign::Unknown {
            if let (Some(new), Some(prev)) = (running_balance, self.last_balance) {
                let delta = new - prev;
                if delta < Decimal::ZERO {
                    amount.sign = Sign::Debit;
                } else if delta > Decimal::ZERO {
                    amount.sign = Sign::Credit;
                }
            }
        }
        // a row without a balance breaks the chain until the next balance or anchor
        self.last_balance = running_balance;

        self.seal();
        self.open = Some(Transaction {
            date,
            post_date,
            description: row.description.clone(),
            amount,
            running_balance,
            source_lines: vec![line.clone()],
            low_confidence: self.hints.is_low_confidence(&row.date),
        });
        Ok(())
    }

    /// Append a date-less, amount-less line to the open description.
    ///
    /// Returns false when there is nothing to extend, the window is used up,
    /// or the line sits on another page.
    pub fn push_continuation(&mut self, line: &RawLine) -> bool {
        let Some(txn) = self.open.as_mut() else {
            return false;
        };
        let same_page = txn.source_lines.last().is_some_and(|l| l.page_index == line.page_index);
        if self.continuations >= self.config.continuation_limit || !same_page {
            return false;
        }

        txn.description.push(' ');
        txn.description.push_str(&line.text);
        txn.source_lines.push(line.clone());
        self.continuations += 1;
        true
    }

    /// Close the open transaction; nothing more will be appended to it.
    pub fn seal(&mut self) {
        if let Some(txn) = self.open.take() {
            self.done.push(txn);
        }
        self.continuations = 0;
    }

    pub fn finish(mut self) -> Vec<Transaction> {
        self.seal();
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::probe_line;
    use crate::types::DateOrder;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn hints() -> DocumentHints {
        DocumentHints {
            order: DateOrder::DayFirst,
            order_established: true,
            years: Default::default(),
        }
    }

    fn push(asm: &mut Assembler<'_>, text: &str, idx: usize) -> Result<(), UnparsedReason> {
        let line = RawLine::new(text, 0, idx);
        let row = probe_line(text, Decimal::MAX).transaction.unwrap();
        asm.push_transaction(&line, &row)
    }

    #[test]
    fn test_balance_delta_infers_debit() {
        let cfg = ParserConfig::default();
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        push(&mut asm, "01/02/2024 Deposit 100.00 500.00", 0).unwrap();
        push(&mut asm, "02/02/2024 Groceries 50.00 450.00", 1).unwrap();
        let txns = asm.finish();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].amount.sign, Sign::Unknown);
        assert_eq!(txns[1].amount.sign, Sign::Debit);
        assert_eq!(txns[1].running_balance, Some(dec("450.00")));
    }

    #[test]
    fn test_row_without_balance_breaks_delta_chain() {
        let cfg = ParserConfig::default();
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        push(&mut asm, "01/03/2024 Deposit 100.00 500.00", 0).unwrap();
        push(&mut asm, "02/03/2024 Salary 300.00", 1).unwrap();
        push(&mut asm, "03/03/2024 Shop 50.00 750.00", 2).unwrap();
        push(&mut asm, "04/03/2024 Fee 5.00 745.00", 3).unwrap();
        let signs: Vec<Sign> = asm.finish().iter().map(|t| t.amount.sign).collect();
        assert_eq!(signs, vec![Sign::Unknown, Sign::Unknown, Sign::Unknown, Sign::Debit]);
    }

    #[test]
    fn test_anchor_feeds_first_delta() {
        let cfg = ParserConfig::default();
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        asm.anchor_balance(dec("1000.00"));
        push(&mut asm, "01/02/2024 Salary 250.00 1250.00", 0).unwrap();
        assert_eq!(asm.finish()[0].amount.sign, Sign::Credit);
    }

    #[test]
    fn test_explicit_sign_is_kept() {
        let cfg = ParserConfig::default();
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        asm.anchor_balance(dec("100.00"));
        push(&mut asm, "01/02/2024 Refund 10.00 CR 90.00", 0).unwrap();
        assert_eq!(asm.finish()[0].amount.sign, Sign::Credit);
    }

    #[test]
    fn test_three_columns() {
        let cfg = ParserConfig::default();
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        push(&mut asm, "03/02/2024 Payroll 0.00 1,200.00 2,200.00", 0).unwrap();
        push(&mut asm, "04/02/2024 Rent 900.00 0.00 1,300.00", 1).unwrap();
        let txns = asm.finish();
        assert_eq!(txns[0].amount.sign, Sign::Credit);
        assert_eq!(txns[0].amount.value, dec("1200.00"));
        assert_eq!(txns[1].amount.sign, Sign::Debit);
        assert_eq!(txns[1].running_balance, Some(dec("1300.00")));
    }

    #[test]
    fn test_continuation_limit() {
        let cfg = ParserConfig {
            continuation_limit: 2,
            ..Default::default()
        };
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        push(&mut asm, "01/02/2024 Card purchase 12.00", 0).unwrap();
        assert!(asm.push_continuation(&RawLine::new("ACME STORE", 0, 1)));
        assert!(asm.push_continuation(&RawLine::new("LONDON", 0, 2)));
        assert!(!asm.push_continuation(&RawLine::new("too far", 0, 3)));
        let txns = asm.finish();
        assert_eq!(txns[0].description, "Card purchase ACME STORE LONDON");
        assert_eq!(txns[0].source_lines.len(), 3);
    }

    #[test]
    fn test_continuation_needs_open_transaction_on_same_page() {
        let cfg = ParserConfig::default();
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        assert!(!asm.push_continuation(&RawLine::new("orphan", 0, 0)));
        push(&mut asm, "01/02/2024 Card purchase 12.00", 1).unwrap();
        assert!(!asm.push_continuation(&RawLine::new("next page text", 1, 0)));
        asm.seal();
        assert!(!asm.push_continuation(&RawLine::new("after seal", 0, 2)));
    }

    #[test]
    fn test_unresolvable_date() {
        let cfg = ParserConfig::default();
        let h = hints();
        let mut asm = Assembler::new(&cfg, &h);
        assert_eq!(push(&mut asm, "04/22 Coffee 4.50", 0), Err(UnparsedReason::UnrecognizedFormat));
        assert!(asm.finish().is_empty());
    }
}
