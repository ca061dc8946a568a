use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One logical line of statement text after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    pub text: String,
    pub page_index: usize,
    /// Physical line position inside the page as extracted (before any lines were dropped).
    pub line_index: usize,
}

impl RawLine {
    pub fn new(text: impl Into<String>, page_index: usize, line_index: usize) -> Self {
        Self {
            text: text.into(),
            page_index,
            line_index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sign {
    Debit,
    Credit,
    Unknown,
}

/// Monetary amount with the sign kept apart from the magnitude.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAmount {
    /// Always non-negative.
    pub value: Decimal,
    /// Currency symbol or code as printed (`$`, `€`, `USD`).
    pub currency: Option<String>,
    pub sign: Sign,
}

impl ParsedAmount {
    pub fn new(value: Decimal, sign: Sign) -> Self {
        Self {
            value: value.abs(),
            currency: None,
            sign,
        }
    }

    /// Signed view: debits negative, credits and unknowns positive.
    pub fn signed(&self) -> Decimal {
        match self.sign {
            Sign::Debit => -self.value,
            Sign::Credit | Sign::Unknown => self.value,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

/// How numeric dates such as `03/04` are read for a whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Second date printed right after the transaction date, when present.
    pub post_date: Option<NaiveDate>,
    pub description: String,
    pub amount: ParsedAmount,
    pub running_balance: Option<Decimal>,
    /// Copies of the lines this record was assembled from, in document order.
    pub source_lines: Vec<RawLine>,
    /// Date was ambiguous and read with the default order, not one established by the document.
    pub low_confidence: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    MoneyMarketSavings,
}

/// Account metadata. Unset fields mean "not found", never zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: Option<String>,
    pub holder_name: Option<String>,
    pub account_name: Option<String>,
    pub account_kind: Option<AccountKind>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub opening_balance: Option<Decimal>,
    pub closing_balance: Option<Decimal>,
}

impl AccountInfo {
    /// Merge `other` into `self`, keeping any value already set.
    pub fn merge(&mut self, other: AccountInfo) {
        fill(&mut self.account_number, other.account_number);
        fill(&mut self.holder_name, other.holder_name);
        fill(&mut self.account_name, other.account_name);
        fill(&mut self.account_kind, other.account_kind);
        fill(&mut self.period_start, other.period_start);
        fill(&mut self.period_end, other.period_end);
        fill(&mut self.opening_balance, other.opening_balance);
        fill(&mut self.closing_balance, other.closing_balance);
    }

    pub fn is_empty(&self) -> bool {
        *self == AccountInfo::default()
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsedReason {
    NoDate,
    NoAmount,
    AmbiguousClassification,
    UnrecognizedFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnparsedSample {
    pub text: String,
    pub page_index: usize,
    pub line_index: usize,
    pub reason: UnparsedReason,
}

impl UnparsedSample {
    pub fn from_line(line: &RawLine, reason: UnparsedReason) -> Self {
        Self {
            text: line.text.clone(),
            page_index: line.page_index,
            line_index: line.line_index,
            reason,
        }
    }
}

/// Everything extracted from one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub account: AccountInfo,
    pub transactions: Vec<Transaction>,
    /// Capped sample of lines that could not be classified.
    pub unparsed_samples: Vec<UnparsedSample>,
    /// Every noise line seen, stored or not.
    pub unparsed_total: usize,
    /// Noise lines counted after the sample cap was reached.
    pub unparsed_dropped: usize,
    pub date_order: DateOrder,
    /// True when `date_order` came from an unambiguous date in the document.
    pub date_order_established: bool,
}

impl ParseResult {
    pub fn empty(date_order: DateOrder) -> Self {
        Self {
            account: AccountInfo::default(),
            transactions: Vec::new(),
            unparsed_samples: Vec::new(),
            unparsed_total: 0,
            unparsed_dropped: 0,
            date_order,
            date_order_established: false,
        }
    }
}
