//! Account metadata recognizers: account number, holder, product header,
//! statement period and account kind.

use std::sync::LazyLock;

use regex::Regex;

use super::date::{DateToken, recognize_dates};
use crate::types::AccountKind;

static ACCOUNT_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:",
        r"account\s*(?:number|num\.?|no\.?|#|:)",
        r"|acct\.?\s*(?:number|no\.?|#)?",
        r"|a/c(?:\s*no\.?)?",
        r")\s*[:#.]?\s*",
    ))
    .unwrap()
});

static IBAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:\biban)\s*:?\s*(?P<iban>[A-Z]{2}\d{2}(?:\s?[A-Z0-9]{4})*(?:\s?[A-Z0-9]{1,4})?)")
        .unwrap()
});

static HOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:(?:account\s+holder(?:\s+name)?|customer\s+name|primary\s+owner|name)\s*:|prepared\s+for:?)",
        r"\s*(?P<name>[A-Za-z][A-Za-z .,'&\-]*[A-Za-z.])\s*$",
    ))
    .unwrap()
});

// "Share Draft Checking - 1234567"
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[A-Za-z&'./\-]+(?:\s+[A-Za-z&'./\-]+)*)\s*-\s*(?P<number>\d{6,})\b").unwrap()
});

static RANGE_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:-|–|—|to|through|thru|until)\s*$").unwrap());

static MM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bmm(?:sa)?\b").unwrap());
static CHK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:chk|draft)\b").unwrap());
static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9 ]+").unwrap());

fn is_mask_char(c: char) -> bool {
    matches!(c, '*' | '•' | 'X' | 'x')
}

fn leading_account_token(tok: &str) -> bool {
    tok.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || is_mask_char(c))
        && (tok.chars().any(|c| c.is_ascii_digit()) || tok.chars().filter(|c| is_mask_char(*c)).count() >= 2)
}

fn continuation_account_token(tok: &str) -> bool {
    tok.len() >= 2 && tok.chars().all(|c| c.is_ascii_digit() || c == '-' || is_mask_char(c))
}

/// Account number after an `Account No` / `Acct` / `A/C` / `IBAN` label,
/// returned as printed (masking preserved).
pub fn recognize_account_number(text: &str) -> Option<String> {
    if let Some(m) = ACCOUNT_LABEL_RE.find(text) {
        let mut toks = text[m.end()..].split_whitespace();
        if let Some(first) = toks.next().filter(|t| leading_account_token(t)) {
            let mut parts = vec![first];
            parts.extend(toks.take_while(|t| continuation_account_token(t)));
            let number = parts.join(" ");
            if number.chars().filter(|c| c.is_ascii_alphanumeric() || is_mask_char(*c)).count() >= 4 {
                return Some(number);
            }
        }
    }

    IBAN_RE
        .captures(text)
        .map(|caps| caps["iban"].trim().to_string())
}

pub fn recognize_holder_name(text: &str) -> Option<String> {
    HOLDER_RE
        .captures(text)
        .map(|caps| caps["name"].trim().to_string())
}

/// `Name - 1234567` product header: `(account name, account number)`.
pub fn recognize_account_header(text: &str) -> Option<(String, String)> {
    let caps = HEADER_RE.captures(text)?;
    let name = caps["name"].trim();
    if !name.chars().any(char::is_alphabetic) {
        return None;
    }
    Some((name.to_string(), caps["number"].to_string()))
}

/// Two dates joined by `-`, `to` or `through`.
pub fn recognize_period(text: &str) -> Option<(DateToken, DateToken)> {
    let dates = recognize_dates(text);
    dates
        .windows(2)
        .find(|pair| RANGE_SEP_RE.is_match(&text[pair[0].end..pair[1].start]))
        .map(|pair| (pair[0], pair[1]))
}

/// Broad account type from a product name.
///
/// Credit-union wording is honoured: "Share Draft" is checking, a bare "Share" is savings.
pub fn classify_account_kind(name: &str) -> Option<AccountKind> {
    let lower = name.to_lowercase();
    let n = NON_ALNUM_RE.replace_all(&lower, " ");

    if n.contains("money market") || MM_RE.is_match(&n) {
        return Some(AccountKind::MoneyMarketSavings);
    }
    if n.contains("checking") || n.contains("share draft") || CHK_RE.is_match(&n) {
        return Some(AccountKind::Checking);
    }
    if n.contains("saving") || n.contains("share") {
        return Some(AccountKind::Savings);
    }
    None
}
