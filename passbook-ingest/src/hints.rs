//! Per-document date context, settled once before any line is classified.

use chrono::NaiveDate;

use crate::config::ParserConfig;
use crate::extractors::{DateToken, YearHint, recognize_dates, recognize_period};
use crate::types::{DateOrder, RawLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentHints {
    pub order: DateOrder,
    /// `order` came from a date that can only be read one way.
    pub order_established: bool,
    pub years: YearHint,
}

impl DocumentHints {
    pub fn scan(lines: &[RawLine], config: &ParserConfig) -> Self {
        let tokens: Vec<Vec<DateToken>> = lines.iter().map(|l| recognize_dates(&l.text)).collect();

        let established = tokens.iter().flatten().find_map(DateToken::implied_order);
        let order = established.unwrap_or(config.default_date_order);

        let year = most_common_year(tokens.iter().flatten()).or(config.fallback_year);
        let plain = YearHint { year, period: None };

        let period = lines
            .iter()
            .filter_map(|l| recognize_period(&l.text))
            .find_map(|(a, b)| {
                let start = a.resolve(order, &plain)?;
                let end = b.resolve(order, &plain)?;
                (start <= end).then_some((start, end))
            });

        Self {
            order,
            order_established: established.is_some(),
            years: YearHint { year, period },
        }
    }

    pub fn resolve(&self, token: &DateToken) -> Option<NaiveDate> {
        token.resolve(self.order, &self.years)
    }

    /// The date was read with a default the document never confirmed.
    pub fn is_low_confidence(&self, token: &DateToken) -> bool {
        token.is_ambiguous() && !self.order_established
    }
}

/// Most frequent explicit year; ties go to the year seen first.
fn most_common_year<'a>(tokens: impl Iterator<Item = &'a DateToken>) -> Option<i32> {
    let mut counts: Vec<(i32, usize)> = Vec::new();
    for year in tokens.filter_map(|t| t.year) {
        match counts.iter_mut().find(|(y, _)| *y == year) {
            Some((_, n)) => *n += 1,
            None => counts.push((year, 1)),
        }
    }

    let mut best: Option<(i32, usize)> = None;
    for (year, n) in counts {
        if best.is_none_or(|(_, m)| n > m) {
            best = Some((year, n));
        }
    }
    best.map(|(y, _)| y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(texts: &[&str]) -> Vec<RawLine> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| RawLine::new(*t, 0, i))
            .collect()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_unambiguous_date_sets_order() {
        let doc = lines(&["01/02/2024 Coffee 4.50", "13/02/2024 Tea 3.00", "02/14/2024 ignored"]);
        let hints = DocumentHints::scan(&doc, &ParserConfig::default());
        assert_eq!(hints.order, DateOrder::DayFirst);
        assert!(hints.order_established);

        let doc = lines(&["01/02/2024 Coffee 4.50", "01/15/2024 Tea 3.00"]);
        let hints = DocumentHints::scan(&doc, &ParserConfig::default());
        assert_eq!(hints.order, DateOrder::MonthFirst);
    }

    #[test]
    fn test_default_order_when_nothing_settles_it() {
        let doc = lines(&["01/02/2024 Coffee 4.50"]);
        let cfg = ParserConfig {
            default_date_order: DateOrder::MonthFirst,
            ..Default::default()
        };
        let hints = DocumentHints::scan(&doc, &cfg);
        assert_eq!(hints.order, DateOrder::MonthFirst);
        assert!(!hints.order_established);
        let tok = recognize_dates("01/02/2024").remove(0);
        assert!(hints.is_low_confidence(&tok));
    }

    #[test]
    fn test_year_inferred_from_document() {
        let doc = lines(&["Statement date 01/31/2024", "01/05 Coffee 4.50", "Printed 03/01/2023"]);
        let hints = DocumentHints::scan(&doc, &ParserConfig::default());
        assert_eq!(hints.years.year, Some(2024));
    }

    #[test]
    fn test_fallback_year() {
        let doc = lines(&["04/22 Coffee 4.50"]);
        let cfg = ParserConfig {
            fallback_year: Some(2026),
            ..Default::default()
        };
        let hints = DocumentHints::scan(&doc, &cfg);
        assert_eq!(hints.years.year, Some(2026));
    }

    #[test]
    fn test_period_spanning_new_year() {
        let doc = lines(&[
            "Statement Period 12/15/2023 - 01/14/2024",
            "12/28 Grocery 10.00",
            "01/03 Fuel 40.00",
        ]);
        let hints = DocumentHints::scan(&doc, &ParserConfig::default());
        assert_eq!(hints.order, DateOrder::MonthFirst);
        assert_eq!(hints.years.period, Some((ymd(2023, 12, 15), ymd(2024, 1, 14))));
        let dec_row = recognize_dates("12/28").remove(0);
        assert_eq!(hints.resolve(&dec_row), Some(ymd(2023, 12, 28)));
    }
}
