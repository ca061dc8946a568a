//! Date recognizer.
//!
//! Recognition and resolution are separate steps: `recognize_date` reports
//! the numbers as printed, and `DateToken::resolve` applies the document's
//! day/month order and year context.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::DateOrder;

const MONTHS: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})([/.\-])(\d{1,2})(?:([/.\-])(\d{4}|\d{2}))?\b").unwrap()
});

static ISO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})-(\d{1,2})-(\d{1,2})\b").unwrap());

static DAY_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?[ \-]?{MONTHS}\b\.?(?:[ ,]+((?:19|20)\d{{2}})\b|-(\d{{2}})\b)?"
    ))
    .unwrap()
});

static MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b{MONTHS}\b\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+((?:19|20)\d{{2}})\b)?"
    ))
    .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `03/04`, `03-04-2024`, `03.04.2024`
    Numeric,
    /// `2024-03-04`
    Iso,
    /// `4 Mar 2024`
    DayMonthName,
    /// `Mar 4, 2024`
    MonthNameDay,
}

/// A date as printed, before any order or year is applied.
///
/// For `Numeric` the two numbers are kept in printed order; for the other
/// patterns `first` is the day and `second` the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateToken {
    pub first: u32,
    pub second: u32,
    pub year: Option<i32>,
    pub pattern: DatePattern,
    /// Byte span in the source text.
    pub start: usize,
    pub end: usize,
}

/// Year context for dates printed without one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearHint {
    pub year: Option<i32>,
    pub period: Option<(NaiveDate, NaiveDate)>,
}

impl YearHint {
    /// Pick a year for a year-less day/month.
    ///
    /// A known statement period wins so December rows of a December-January
    /// statement land in the earlier year.
    pub fn year_for(&self, month: u32, day: u32) -> Option<i32> {
        if let Some((start, end)) = self.period {
            use chrono::Datelike;
            for y in [end.year(), start.year()] {
                if let Some(d) = NaiveDate::from_ymd_opt(y, month, day) {
                    if start <= d && d <= end {
                        return Some(y);
                    }
                }
            }
        }
        self.year
    }
}

impl DateToken {
    /// Day/month order this token proves, if any (a number above 12 can only be a day).
    pub fn implied_order(&self) -> Option<DateOrder> {
        if self.pattern != DatePattern::Numeric {
            return None;
        }
        match (self.first > 12, self.second > 12) {
            (true, false) => Some(DateOrder::DayFirst),
            (false, true) => Some(DateOrder::MonthFirst),
            _ => None,
        }
    }

    /// Both readings are valid and give different dates.
    pub fn is_ambiguous(&self) -> bool {
        self.pattern == DatePattern::Numeric
            && self.first <= 12
            && self.second <= 12
            && self.first != self.second
    }

    /// `(day, month)` under the given order.
    pub fn day_month(&self, order: DateOrder) -> (u32, u32) {
        match (self.pattern, order) {
            (DatePattern::Numeric, DateOrder::MonthFirst) => (self.second, self.first),
            _ => (self.first, self.second),
        }
    }

    pub fn resolve(&self, order: DateOrder, years: &YearHint) -> Option<NaiveDate> {
        let (day, month) = self.day_month(order);
        let year = match self.year {
            Some(y) => y,
            None => years.year_for(month, day)?,
        };
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

fn full_year(raw: &str) -> Option<i32> {
    let y: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + y } else { y })
}

fn month_number(name: &str) -> Option<u32> {
    let m = match name.get(..3)?.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

/// A year-less `01/15` glued to more digits with the same separator
/// (`2024/01/15`, `01/15/2`) is a fragment, not a date.
fn glued_to_digits(text: &str, start: usize, end: usize, sep: char) -> bool {
    let mut before = text[..start].chars().rev();
    let glued_before = before.next() == Some(sep) && before.next().is_some_and(|c| c.is_ascii_digit());
    let mut after = text[end..].chars();
    let glued_after = after.next() == Some(sep) && after.next().is_some_and(|c| c.is_ascii_digit());
    glued_before || glued_after
}

fn numeric_tokens(text: &str) -> Vec<DateToken> {
    let mut out = Vec::new();
    let mut pos = 0;

    while let Some(caps) = NUMERIC_RE.captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };
        let start = whole.start();
        let sep = caps[2].chars().next().unwrap_or('/');

        let (year, end) = match (caps.get(4), caps.get(5), caps.get(3)) {
            (Some(sep2), Some(y), _) if sep2.as_str().starts_with(sep) => (full_year(y.as_str()), whole.end()),
            // "01/15-01/31": the tail belongs to the next date
            (Some(_), Some(_), Some(second)) => (None, second.end()),
            _ => (None, whole.end()),
        };
        pos = end.max(start + 1);

        let (Ok(first), Ok(second)) = (caps[1].parse::<u32>(), caps[3].parse::<u32>()) else {
            continue;
        };
        // 4.50 is money, not the 4th of a 50th month
        if sep == '.' && year.is_none() {
            continue;
        }
        if year.is_none() && glued_to_digits(text, start, end, sep) {
            continue;
        }
        if first == 0 || second == 0 || first > 31 || second > 31 || (first > 12 && second > 12) {
            continue;
        }

        out.push(DateToken {
            first,
            second,
            year,
            pattern: DatePattern::Numeric,
            start,
            end,
        });
    }

    out
}

fn iso_tokens(text: &str) -> Vec<DateToken> {
    ISO_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let month: u32 = caps[2].parse().ok()?;
            let day: u32 = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(caps[1].parse().ok()?, month, day)?;
            Some(DateToken {
                first: day,
                second: month,
                year: full_year(&caps[1]),
                pattern: DatePattern::Iso,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

fn day_month_tokens(text: &str) -> Vec<DateToken> {
    DAY_MONTH_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let day: u32 = caps[1].parse().ok()?;
            let month = month_number(&caps[2])?;
            let year = caps.get(3).or(caps.get(4)).and_then(|y| full_year(y.as_str()));
            (1..=31).contains(&day).then_some(DateToken {
                first: day,
                second: month,
                year,
                pattern: DatePattern::DayMonthName,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

fn month_day_tokens(text: &str) -> Vec<DateToken> {
    MONTH_DAY_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let month = month_number(&caps[1])?;
            let day: u32 = caps[2].parse().ok()?;
            let year = caps.get(3).and_then(|y| full_year(y.as_str()));
            (1..=31).contains(&day).then_some(DateToken {
                first: day,
                second: month,
                year,
                pattern: DatePattern::MonthNameDay,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// All dates in `text`, left to right, without overlaps.
pub fn recognize_dates(text: &str) -> Vec<DateToken> {
    let mut all: Vec<DateToken> = iso_tokens(text);
    all.extend(day_month_tokens(text));
    all.extend(month_day_tokens(text));
    all.extend(numeric_tokens(text));
    // earliest first; at the same start the longer match wins
    all.sort_by_key(|t| (t.start, std::cmp::Reverse(t.end)));

    let mut out: Vec<DateToken> = Vec::new();
    for tok in all {
        if out.last().is_none_or(|prev| tok.start >= prev.end) {
            out.push(tok);
        }
    }
    out
}

/// First date anywhere in `text`.
pub fn recognize_date(text: &str) -> Option<DateToken> {
    recognize_dates(text).into_iter().next()
}

/// Date that opens the line, as transaction rows do.
pub fn leading_date(text: &str) -> Option<DateToken> {
    recognize_date(text).filter(|t| t.start == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numeric_with_year() {
        let t = recognize_date("01/02/2024 Coffee Shop 4.50").unwrap();
        assert_eq!((t.first, t.second, t.year), (1, 2, Some(2024)));
        assert_eq!(t.pattern, DatePattern::Numeric);
        assert_eq!((t.start, t.end), (0, 10));
        assert!(t.is_ambiguous());
        assert_eq!(t.implied_order(), None);
    }

    #[test]
    fn test_resolution_follows_order() {
        let t = recognize_date("03/04/2024").unwrap();
        let hint = YearHint::default();
        assert_eq!(t.resolve(DateOrder::DayFirst, &hint), Some(ymd(2024, 4, 3)));
        assert_eq!(t.resolve(DateOrder::MonthFirst, &hint), Some(ymd(2024, 3, 4)));
    }

    #[test]
    fn test_day_above_twelve_implies_order() {
        assert_eq!(recognize_date("25/12/2023").unwrap().implied_order(), Some(DateOrder::DayFirst));
        assert_eq!(recognize_date("12/25/2023").unwrap().implied_order(), Some(DateOrder::MonthFirst));
    }

    #[test]
    fn test_two_digit_year_and_dash() {
        let t = recognize_date("07-23-25 Payroll").unwrap();
        assert_eq!(t.year, Some(2025));
        assert_eq!(t.resolve(DateOrder::MonthFirst, &YearHint::default()), Some(ymd(2025, 7, 23)));
    }

    #[test]
    fn test_dot_form_needs_year() {
        assert!(recognize_date("Coffee 4.50").is_none());
        let t = recognize_date("15.03.2024 Rent").unwrap();
        assert_eq!(t.implied_order(), Some(DateOrder::DayFirst));
    }

    #[test]
    fn test_money_is_not_a_date() {
        assert!(recognize_date("Deposit 1,250.50 3,400.00").is_none());
        assert!(recognize_date("Fee -15.00").is_none());
    }

    #[test]
    fn test_iso_not_split() {
        let dates = recognize_dates("2024-01-15 Transfer");
        assert_eq!(dates.len(), 1);
        assert_eq!(dates[0].pattern, DatePattern::Iso);
        assert_eq!(dates[0].resolve(DateOrder::MonthFirst, &YearHint::default()), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn test_textual_patterns() {
        let t = recognize_date("Jul 20 Jul 22 H-E-B #455").unwrap();
        assert_eq!(t.pattern, DatePattern::MonthNameDay);
        assert_eq!((t.first, t.second, t.year), (20, 7, None));
        assert_eq!(recognize_dates("Jul 20 Jul 22 H-E-B #455").len(), 2);

        let t = recognize_date("01 Feb 2024 Direct Debit").unwrap();
        assert_eq!(t.pattern, DatePattern::DayMonthName);
        assert_eq!(t.resolve(DateOrder::MonthFirst, &YearHint::default()), Some(ymd(2024, 2, 1)));

        let t = recognize_date("March 5, 2024").unwrap();
        assert_eq!(t.resolve(DateOrder::DayFirst, &YearHint::default()), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn test_month_word_inside_other_word() {
        assert!(recognize_date("3 market street").is_none());
    }

    #[test]
    fn test_year_hint_prefers_period() {
        let hint = YearHint {
            year: Some(2024),
            period: Some((ymd(2023, 12, 15), ymd(2024, 1, 14))),
        };
        assert_eq!(hint.year_for(12, 28), Some(2023));
        assert_eq!(hint.year_for(1, 3), Some(2024));

        let t = leading_date("12/28 Grocery 10.00").unwrap();
        assert_eq!(t.resolve(DateOrder::MonthFirst, &hint), Some(ymd(2023, 12, 28)));
    }

    #[test]
    fn test_yearless_without_hint_does_not_resolve() {
        let t = leading_date("04/22 Coffee 4.50").unwrap();
        assert_eq!(t.resolve(DateOrder::MonthFirst, &YearHint::default()), None);
    }

    #[test]
    fn test_leading_date_only_at_start() {
        assert!(leading_date("Paid on 01/02/2024").is_none());
        assert!(leading_date("01/02/2024 Paid").is_some());
    }
}
