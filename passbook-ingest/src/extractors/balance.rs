use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::amount::amounts_in;
use crate::types::ParsedAmount;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:",
        r"(?P<open>opening|beginning|starting|previous)\s+balance",
        r"|(?P<fwd>balance\s+(?:brought\s+)?(?:forward|fwd))",
        r"|(?P<close>closing|ending)\s+balance",
        r")\b",
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceKind {
    Opening,
    Forward,
    Closing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMarker {
    pub kind: BalanceKind,
    pub amount: ParsedAmount,
}

impl BalanceMarker {
    /// Balance as a signed number; a `DR` or parenthesized balance is overdrawn.
    pub fn balance(&self) -> Decimal {
        self.amount.signed()
    }
}

/// Every labelled balance on the line, each paired with the first amount
/// printed after its label. Labels with no amount are skipped.
pub fn recognize_balance_markers(text: &str, max: Decimal) -> Vec<BalanceMarker> {
    let labels: Vec<(BalanceKind, usize, usize)> = LABEL_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = if caps.name("open").is_some() {
                BalanceKind::Opening
            } else if caps.name("fwd").is_some() {
                BalanceKind::Forward
            } else {
                BalanceKind::Closing
            };
            Some((kind, whole.start(), whole.end()))
        })
        .collect();

    labels
        .iter()
        .enumerate()
        .filter_map(|(i, (kind, _, label_end))| {
            let segment_end = labels.get(i + 1).map_or(text.len(), |next| next.1);
            let segment = &text[*label_end..segment_end];
            let first = amounts_in(segment, max).into_iter().next()?;
            Some(BalanceMarker {
                kind: *kind,
                amount: first.amount,
            })
        })
        .collect()
}

pub fn recognize_balance_marker(text: &str) -> Option<BalanceMarker> {
    recognize_balance_markers(text, Decimal::MAX).into_iter().next()
}

/// True when `description` is nothing but a balance label, e.g. `Ending Balance`
/// or `Beginning Balance as of 01/01`.
pub fn is_balance_label(description: &str) -> bool {
    let Some(m) = LABEL_RE.find(description) else {
        return false;
    };
    if !description[..m.start()].trim().is_empty() {
        return false;
    }
    description[m.end()..].split_whitespace().all(|w| {
        matches!(w.to_ascii_lowercase().as_str(), "on" | "as" | "of" | "at")
            || !w.chars().any(char::is_alphabetic)
    })
}
