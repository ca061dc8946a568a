//! Amount recognizer.
//!
//! An amount expression is one numeric token plus optional detached pieces:
//! a leading `-`/`+`, a currency symbol or ISO code on either side, and a
//! `DR`/`CR` suffix. `DR`/`CR` overrides every other sign marker.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use super::date::{DateToken, recognize_dates};
use crate::types::{ParsedAmount, Sign};

static CORE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<lp>\()?",
        r"(?P<sign>[+-])?",
        r"(?P<pre>[$€£¥₹])?",
        r"(?P<sign2>[+-])?",
        r"(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?|\.\d{1,2})",
        r"(?P<post>[$€£¥₹])?",
        r"(?P<trail>-)?",
        r"(?P<rp>\))?",
        r"(?P<drcr>(?i:dr|cr))?$",
    ))
    .unwrap()
});

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").unwrap());

const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "CAD", "AUD", "NZD", "CHF", "JPY", "INR", "SGD", "HKD", "ZAR",
];
const CURRENCY_SYMBOLS: &[&str] = &["$", "€", "£", "¥", "₹"];

/// Bare integers longer than this are account or reference numbers.
const MAX_BARE_DIGITS: usize = 7;

/// A bare integer at least this long, printed left of a money-shaped amount,
/// is a reference number (`2100002 120.47-`).
const MIN_REFERENCE_DIGITS: usize = 5;

/// An amount found inside a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountToken {
    pub amount: ParsedAmount,
    /// Byte span of the whole expression, detached markers included.
    pub start: usize,
    pub end: usize,
    /// Digits only: no separator, decimals, currency or sign marker.
    pub bare: bool,
}

#[derive(Debug, Clone, Copy)]
struct Tok<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn tokens(text: &str) -> Vec<Tok<'_>> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| Tok {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

fn sign_marker(tok: &str) -> Option<Sign> {
    match tok.trim_end_matches('.').to_ascii_uppercase().as_str() {
        "DR" => Some(Sign::Debit),
        "CR" => Some(Sign::Credit),
        _ => None,
    }
}

fn currency_token(tok: &str) -> Option<&str> {
    CURRENCY_SYMBOLS
        .iter()
        .chain(CURRENCY_CODES)
        .find(|c| **c == tok)
        .copied()
}

struct Core {
    amount: ParsedAmount,
    bare: bool,
}

/// Parse one whitespace-free token such as `(1,250.50)`, `-$14.05`, `120.47-`, `100.00CR`.
fn parse_core(tok: &str, max: Decimal) -> Option<Core> {
    let caps = CORE_RE.captures(tok)?;
    if caps.name("lp").is_some() != caps.name("rp").is_some() {
        return None;
    }

    let num = &caps["num"];
    let digits = num.replace(',', "");
    let mut value = Decimal::from_str(&digits).ok()?;
    if value > max {
        return None;
    }
    value.rescale(2);

    let sign = if let Some(m) = caps.name("drcr") {
        sign_marker(m.as_str())?
    } else if caps.name("lp").is_some() || caps.name("trail").is_some() {
        Sign::Debit
    } else {
        match caps.name("sign").or(caps.name("sign2")).map(|m| m.as_str()) {
            Some("-") => Sign::Debit,
            Some("+") => Sign::Credit,
            _ => Sign::Unknown,
        }
    };

    let currency = caps.name("pre").or(caps.name("post")).map(|m| m.as_str().to_string());
    let bare = tok == num && !num.contains(',') && !num.contains('.');
    if bare && digits.len() > MAX_BARE_DIGITS {
        return None;
    }

    Some(Core {
        amount: ParsedAmount {
            value,
            currency,
            sign,
        },
        bare,
    })
}

/// Read one amount expression ending at token `end` (exclusive), never
/// reaching before token `floor`. Returns the index of its first token.
fn take_amount_back(toks: &[Tok<'_>], floor: usize, end: usize, max: Decimal) -> Option<(usize, AmountToken)> {
    if end <= floor {
        return None;
    }
    let mut i = end - 1;
    let last = toks[i].end;

    let override_sign = sign_marker(toks[i].text);
    if override_sign.is_some() {
        if i == floor {
            return None;
        }
        i -= 1;
    }

    let mut currency = None;
    if let Some(code) = currency_token(toks[i].text) {
        if i == floor {
            return None;
        }
        currency = Some(code.to_string());
        i -= 1;
    }

    let core = parse_core(toks[i].text, max)?;
    let mut amount = core.amount;
    let mut bare = core.bare && override_sign.is_none() && currency.is_none();

    // detached prefixes: "$ 5.82", "- $14.05", "EUR 12.00"
    if i > floor {
        if let Some(code) = currency_token(toks[i - 1].text) {
            if amount.currency.is_none() && currency.is_none() {
                currency = Some(code.to_string());
                bare = false;
                i -= 1;
            }
        }
    }
    if i > floor && amount.sign == Sign::Unknown {
        let detached = match toks[i - 1].text {
            "-" => Some(Sign::Debit),
            "+" => Some(Sign::Credit),
            _ => None,
        };
        if let Some(sign) = detached {
            amount.sign = sign;
            bare = false;
            i -= 1;
        }
    }

    if let Some(sign) = override_sign {
        amount.sign = sign;
    }
    if amount.currency.is_none() {
        amount.currency = currency;
    }

    Some((
        i,
        AmountToken {
            amount,
            start: toks[i].start,
            end: last,
            bare,
        },
    ))
}

/// Recognize `text` as a single amount expression, bare integers included.
pub fn recognize_amount(text: &str) -> Option<ParsedAmount> {
    let toks = tokens(text);
    match take_amount_back(&toks, 0, toks.len(), Decimal::MAX)? {
        (0, tok) => Some(tok.amount),
        _ => None,
    }
}

fn is_reference(tok: &AmountToken, right: Option<&AmountToken>) -> bool {
    tok.bare && tok.end - tok.start >= MIN_REFERENCE_DIGITS && right.is_some_and(|r| !r.bare)
}

/// The year of `Jan 31, 2024` is not a whole-number amount.
fn inside_date(tok: &AmountToken, dates: &[DateToken]) -> bool {
    tok.bare && dates.iter().any(|d| tok.start < d.end && d.start < tok.end)
}

/// Amount columns at the end of a line, left to right (at most three).
///
/// Whole numbers such as `1000` count; a long bare number sitting left of a
/// money-shaped amount ends the scan as a reference number.
pub fn trailing_amounts(text: &str, max: Decimal) -> Vec<AmountToken> {
    let toks = tokens(text);
    let dates = recognize_dates(text);
    let mut end = toks.len();
    let mut out: Vec<AmountToken> = Vec::new();

    while out.len() < 3 {
        match take_amount_back(&toks, 0, end, max) {
            Some((first, tok)) if !is_reference(&tok, out.last()) && !inside_date(&tok, &dates) => {
                out.push(tok);
                end = first;
            }
            _ => break,
        }
    }

    out.reverse();
    out
}

/// Every amount in `text`, left to right.
///
/// Bare integers only count inside the trailing amount columns; elsewhere
/// they are store, card or reference numbers.
pub fn amounts_in(text: &str, max: Decimal) -> Vec<AmountToken> {
    let columns: Vec<usize> = trailing_amounts(text, max)
        .iter()
        .filter(|t| t.bare)
        .map(|t| t.start)
        .collect();
    let toks = tokens(text);
    let mut out = Vec::new();
    let mut floor = 0;
    let mut end = 1;

    while end <= toks.len() {
        let Some((first, mut found)) =
            take_amount_back(&toks, floor, end, max).filter(|(_, t)| !t.bare || columns.contains(&t.start))
        else {
            end += 1;
            continue;
        };

        // let a following "CR" / "USD" attach to this amount
        let mut stop = end;
        for ext in [end + 1, end + 2] {
            if ext > toks.len() {
                break;
            }
            match take_amount_back(&toks, floor, ext, max) {
                Some((f, longer)) if f == first => {
                    found = longer;
                    stop = ext;
                }
                _ => break,
            }
        }

        out.push(found);
        floor = stop;
        end = stop + 1;
    }

    out
}
