//! Line classification.
//!
//! `probe_line` runs every recognizer over a line and records what matched;
//! `ClassifierState::step` is the pure transition that turns a probe into a
//! route for the driver. Neither touches shared state.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::extractors::{
    AmountToken, BalanceKind, BalanceMarker, DateToken, amounts_in, is_balance_label, leading_date,
    recognize_account_header, recognize_account_number, recognize_dates, recognize_holder_name,
    recognize_period, recognize_balance_markers, trailing_amounts,
};
use crate::types::UnparsedReason;

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:transaction\s+detail|transactions|account\s+activity|transaction\s+history",
        r"|deposits\s+and\s+(?:other\s+)?(?:additions|credits)",
        r"|withdrawals(?:\s+and\s+(?:other\s+)?(?:subtractions|debits))?",
        r"|checks\s+paid|electronic\s+withdrawals|daily\s+(?:ending\s+)?balances?)(?:\s*\(continued\))?:?$",
    ))
    .unwrap()
});

const COLUMN_WORDS: &[&str] = &[
    "date", "trans", "transaction", "post", "posting", "posted", "value", "description", "details",
    "particulars", "narration", "reference", "ref", "amount", "balance", "debit", "debits", "credit",
    "credits", "withdrawal", "withdrawals", "deposit", "deposits", "paid", "in", "out", "money",
    "cheque", "check", "no", "type",
];
const COLUMN_KEYS: &[&str] = &["date", "description", "amount", "balance"];

/// A row shaped like a ledger entry: leading date, description, amount columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionLine {
    pub date: DateToken,
    pub post_date: Option<DateToken>,
    pub description: String,
    /// One to three amounts, left to right.
    pub amounts: Vec<AmountToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountProbe {
    pub account_number: Option<String>,
    pub holder_name: Option<String>,
    /// `(account name, account number)` from a product header line.
    pub header: Option<(String, String)>,
    pub period: Option<(DateToken, DateToken)>,
}

impl AccountProbe {
    pub fn is_empty(&self) -> bool {
        self.account_number.is_none()
            && self.holder_name.is_none()
            && self.header.is_none()
            && self.period.is_none()
    }
}

/// What every recognizer found on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProbe {
    pub has_date: bool,
    pub has_amount: bool,
    pub transaction: Option<TransactionLine>,
    pub markers: Vec<BalanceMarker>,
    pub account: AccountProbe,
    pub section_header: bool,
}

impl LineProbe {
    pub fn has_closing_marker(&self) -> bool {
        self.markers.iter().any(|m| m.kind == BalanceKind::Closing)
    }

    /// Most specific reason this line could not be used.
    pub fn noise_reason(&self) -> UnparsedReason {
        match (self.has_date, self.has_amount) {
            (true, true) => UnparsedReason::AmbiguousClassification,
            (true, false) => UnparsedReason::NoAmount,
            (false, true) => UnparsedReason::NoDate,
            (false, false) => UnparsedReason::UnrecognizedFormat,
        }
    }
}

fn is_column_header(text: &str) -> bool {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    words.len() >= 2
        && words.iter().all(|w| COLUMN_WORDS.contains(&w.as_str()))
        && words.iter().any(|w| COLUMN_KEYS.contains(&w.as_str()))
}

/// A dated row whose description is only a balance label (`01/31 Ending Balance 995.50`)
/// is a balance marker in every classifier state, never a ledger row.
fn transaction_line(text: &str, dates: &[DateToken], amounts: Vec<AmountToken>) -> Option<TransactionLine> {
    let date = *dates.first().filter(|d| d.start == 0)?;
    let first_amount = amounts.first()?;

    // "Jul 20 Jul 22 ..." carries a post date right after the transaction date
    let post_date = dates
        .get(1)
        .filter(|d| d.start < first_amount.start && text[date.end..d.start].trim().is_empty())
        .copied();
    let desc_start = post_date.map_or(date.end, |d| d.end);
    if first_amount.start < desc_start {
        return None;
    }

    let description = text[desc_start..first_amount.start].trim().to_string();
    if description.is_empty() || is_balance_label(&description) {
        return None;
    }

    Some(TransactionLine {
        date,
        post_date,
        description,
        amounts,
    })
}

/// Run all recognizers over `text`. Pure.
pub fn probe_line(text: &str, max_amount: Decimal) -> LineProbe {
    let dates = recognize_dates(text);
    let has_amount = !amounts_in(text, max_amount).is_empty();
    let transaction = leading_date(text)
        .and_then(|_| transaction_line(text, &dates, trailing_amounts(text, max_amount)));

    let account = AccountProbe {
        account_number: recognize_account_number(text),
        holder_name: recognize_holder_name(text),
        header: recognize_account_header(text),
        period: recognize_period(text),
    };

    LineProbe {
        has_date: !dates.is_empty(),
        has_amount,
        transaction,
        markers: recognize_balance_markers(text, max_amount),
        account,
        section_header: SECTION_RE.is_match(text) || is_column_header(text),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierState {
    #[default]
    SeekingHeader,
    InTransactions,
    SeekingFooter,
}

/// Where the driver sends a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Transaction,
    AccountInfo,
    SectionHeader,
    /// Candidate description continuation; the assembler may still refuse it.
    Continuation,
    Noise(UnparsedReason),
}

impl ClassifierState {
    pub fn step(self, probe: &LineProbe) -> (ClassifierState, Route) {
        use ClassifierState::*;

        let is_txn = probe.transaction.is_some();
        let is_account = !probe.markers.is_empty() || !probe.account.is_empty();

        match self {
            SeekingHeader => {
                // balance markers win over ledger rows only before the ledger starts
                if !probe.markers.is_empty() {
                    (SeekingHeader, Route::AccountInfo)
                } else if is_txn {
                    (InTransactions, Route::Transaction)
                } else if is_account {
                    (SeekingHeader, Route::AccountInfo)
                } else if probe.section_header {
                    (SeekingHeader, Route::SectionHeader)
                } else {
                    (SeekingHeader, Route::Noise(probe.noise_reason()))
                }
            }
            InTransactions => {
                if is_txn {
                    (InTransactions, Route::Transaction)
                } else if probe.has_closing_marker() {
                    (SeekingFooter, Route::AccountInfo)
                } else if is_account {
                    (InTransactions, Route::AccountInfo)
                } else if probe.section_header {
                    (InTransactions, Route::SectionHeader)
                } else if !probe.has_date && !probe.has_amount {
                    (InTransactions, Route::Continuation)
                } else {
                    (InTransactions, Route::Noise(probe.noise_reason()))
                }
            }
            SeekingFooter => {
                // a second ledger (next account) can follow a closing balance
                if is_txn {
                    (InTransactions, Route::Transaction)
                } else if is_account {
                    (SeekingFooter, Route::AccountInfo)
                } else if probe.section_header {
                    (SeekingFooter, Route::SectionHeader)
                } else {
                    (SeekingFooter, Route::Noise(probe.noise_reason()))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe(text: &str) -> LineProbe {
        probe_line(text, Decimal::MAX)
    }

    #[test]
    fn test_probe_transaction_row() {
        let p = probe("01/02/2024 Coffee Shop 4.50 995.50");
        let txn = p.transaction.unwrap();
        assert_eq!(txn.description, "Coffee Shop");
        assert_eq!(txn.amounts.len(), 2);
        assert!(txn.post_date.is_none());
    }

    #[test]
    fn test_probe_post_date() {
        let txn = probe("Jul 20 Jul 22 H-E-B #455SAN MARCOSTX $5.82").transaction.unwrap();
        assert!(txn.post_date.is_some());
        assert_eq!(txn.description, "H-E-B #455SAN MARCOSTX");
    }

    #[test]
    fn test_dated_balance_label_is_not_a_transaction() {
        let p = probe("01/31/2024 Ending Balance 995.50");
        assert!(p.transaction.is_none());
        assert!(p.has_closing_marker());
    }

    #[test]
    fn test_missing_description_is_ambiguous() {
        let p = probe("01/02/2024 4.50");
        assert!(p.transaction.is_none());
        assert_eq!(p.noise_reason(), UnparsedReason::AmbiguousClassification);
    }

    #[test]
    fn test_noise_reasons() {
        assert_eq!(probe("01/02/2024 Coffee Shop").noise_reason(), UnparsedReason::NoAmount);
        assert_eq!(probe("Interest paid 1.25").noise_reason(), UnparsedReason::NoDate);
        assert_eq!(probe("Thank you for banking").noise_reason(), UnparsedReason::UnrecognizedFormat);
    }

    #[test]
    fn test_section_headers() {
        assert!(probe("TRANSACTION DETAIL").section_header);
        assert!(probe("Date Description Amount Balance").section_header);
        assert!(probe("Deposits and Additions").section_header);
        assert!(!probe("Coffee Shop").section_header);
    }

    #[test]
    fn test_header_state_prefers_balance_marker() {
        let p = probe("Opening Balance 1000.00");
        assert_eq!(ClassifierState::SeekingHeader.step(&p), (ClassifierState::SeekingHeader, Route::AccountInfo));
    }

    #[test]
    fn test_transaction_enters_ledger() {
        let p = probe("01/02/2024 Coffee Shop 4.50 995.50");
        assert_eq!(ClassifierState::SeekingHeader.step(&p), (ClassifierState::InTransactions, Route::Transaction));
        assert_eq!(ClassifierState::SeekingFooter.step(&p), (ClassifierState::InTransactions, Route::Transaction));
    }

    #[test]
    fn test_closing_marker_leaves_ledger() {
        let p = probe("Closing Balance 995.50");
        assert_eq!(ClassifierState::InTransactions.step(&p), (ClassifierState::SeekingFooter, Route::AccountInfo));
    }

    #[test]
    fn test_ledger_row_beats_marker_inside_ledger() {
        let p = probe("01/15/2024 Transfer from Opening Balance Reserve 20.00 1020.00");
        assert!(p.transaction.is_some());
        assert!(!p.markers.is_empty());
        assert_eq!(ClassifierState::SeekingHeader.step(&p).1, Route::AccountInfo);
        assert_eq!(ClassifierState::InTransactions.step(&p), (ClassifierState::InTransactions, Route::Transaction));
    }

    #[test]
    fn test_plain_text_in_ledger_is_continuation() {
        let p = probe("CARD ENDING 1234 LONDON GB");
        assert_eq!(ClassifierState::InTransactions.step(&p), (ClassifierState::InTransactions, Route::Continuation));
        assert_eq!(
            ClassifierState::SeekingHeader.step(&p),
            (ClassifierState::SeekingHeader, Route::Noise(UnparsedReason::UnrecognizedFormat))
        );
    }

    #[test]
    fn test_footer_noise() {
        let p = probe("Member FDIC");
        assert_eq!(
            ClassifierState::SeekingFooter.step(&p),
            (ClassifierState::SeekingFooter, Route::Noise(UnparsedReason::UnrecognizedFormat))
        );
    }
}
