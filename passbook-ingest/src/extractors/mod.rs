//! Field extractors. Each recognizer is a pure function returning `None`
//! when nothing matches, so the classifier can probe a line with all of them.

pub mod account;
pub mod amount;
pub mod balance;
pub mod date;

pub use account::{
    classify_account_kind, recognize_account_header, recognize_account_number, recognize_holder_name,
    recognize_period,
};
pub use amount::{AmountToken, amounts_in, recognize_amount, trailing_amounts};
pub use balance::{BalanceKind, BalanceMarker, is_balance_label, recognize_balance_marker, recognize_balance_markers};
pub use date::{DatePattern, DateToken, YearHint, leading_date, recognize_date, recognize_dates};
