//! Turns raw page text from the PDF-to-text step into ordered logical lines.
//!
//! Cleaning is deliberately conservative: whitespace is collapsed, control
//! characters removed, words hyphenated across a line break re-joined, and
//! page furniture (page numbers, repeated letterhead) dropped. Wrapped
//! transaction descriptions are left alone here; the assembler owns that.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::config::ParserConfig;
use crate::extractors::{leading_date, trailing_amounts};
use crate::types::RawLine;

static BOILERPLATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^page\s+\d+(?:\s+of\s+\d+)?$",
        r"(?i)^statement\s+period:?$",
        r"(?i)^statement\s+of\s+account$",
        r"(?i)^\(?continued\s+on\s+(?:the\s+)?next\s+page\.?\)?$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Lines at the top and bottom of a page checked for repeated letterhead.
const LETTERHEAD_ZONE: usize = 3;

pub fn is_boilerplate(text: &str) -> bool {
    BOILERPLATE_RES.iter().any(|re| re.is_match(text))
}

/// Collapse whitespace, drop control characters and trim.
pub fn clean_line(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .filter(|c| *c != '\u{ad}')
        .map(|c| if c == '\t' || c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn ends_with_word_hyphen(text: &str) -> bool {
    let mut rev = text.chars().rev();
    matches!((rev.next(), rev.next()), (Some('-'), Some(c)) if c.is_alphabetic())
}

fn starts_lowercase(text: &str) -> bool {
    text.chars().next().is_some_and(|c| c.is_lowercase())
}

fn page_lines(page: &str, page_index: usize, config: &ParserConfig) -> Vec<RawLine> {
    let mut out: Vec<RawLine> = Vec::new();

    for (line_index, raw) in page.lines().enumerate() {
        let text = clean_line(raw);
        if text.is_empty() {
            continue;
        }
        if config.drop_boilerplate && is_boilerplate(&text) {
            continue;
        }

        // "Transfer to Sav-" / "ings account" -> one word
        if let Some(prev) = out.last_mut() {
            if ends_with_word_hyphen(&prev.text) && starts_lowercase(&text) {
                prev.text.pop();
                prev.text.push_str(&text);
                continue;
            }
        }

        out.push(RawLine::new(text, page_index, line_index));
    }

    out
}

/// Dated rows with an amount are ledger entries even when two pages repeat them.
fn is_ledger_row(text: &str, max_amount: Decimal) -> bool {
    leading_date(text).is_some() && !trailing_amounts(text, max_amount).is_empty()
}

fn zone_texts(lines: &[RawLine], max_amount: Decimal) -> HashSet<&str> {
    let head = lines.iter().take(LETTERHEAD_ZONE);
    let tail = lines.iter().rev().take(LETTERHEAD_ZONE);
    head.chain(tail)
        .map(|l| l.text.as_str())
        .filter(|t| !is_ledger_row(t, max_amount))
        .collect()
}

/// Texts found in the header/footer zone of every non-empty page.
fn letterhead(pages: &[Vec<RawLine>], max_amount: Decimal) -> HashSet<String> {
    let non_empty: Vec<&Vec<RawLine>> = pages.iter().filter(|p| !p.is_empty()).collect();
    if non_empty.len() < 2 {
        return HashSet::new();
    }

    let mut common: HashSet<&str> = zone_texts(non_empty[0], max_amount);
    for page in &non_empty[1..] {
        let zone = zone_texts(page, max_amount);
        common.retain(|t| zone.contains(t));
    }
    common.into_iter().map(str::to_string).collect()
}

fn in_zone(idx: usize, len: usize) -> bool {
    idx < LETTERHEAD_ZONE || idx + LETTERHEAD_ZONE >= len
}

/// Normalize page texts into lines ordered by `(page_index, line_index)`.
///
/// Never fails; blank input yields an empty vector.
pub fn normalize_pages<S: AsRef<str>>(pages: &[S], config: &ParserConfig) -> Vec<RawLine> {
    let per_page: Vec<Vec<RawLine>> = pages
        .iter()
        .enumerate()
        .map(|(i, p)| page_lines(p.as_ref(), i, config))
        .collect();

    let repeated = if config.drop_boilerplate {
        letterhead(&per_page, config.max_amount)
    } else {
        HashSet::new()
    };

    // The first copy of a letterhead line survives; later pages lose theirs.
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for page in per_page {
        let len = page.len();
        for (idx, line) in page.into_iter().enumerate() {
            if in_zone(idx, len) && repeated.contains(&line.text) && !seen.insert(line.text.clone()) {
                continue;
            }
            out.push(line);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: &[RawLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_clean_line_collapses_whitespace() {
        assert_eq!(clean_line("  04/22\t\tCoffee   Shop \u{a0} 4.50  "), "04/22 Coffee Shop 4.50");
        assert_eq!(clean_line("Pay\u{7}roll"), "Payroll");
        assert_eq!(clean_line("   "), "");
    }

    #[test]
    fn test_drops_page_markers_and_blank_lines() {
        let page = "Page 1 of 3\n\n01/02/2024 Coffee 4.50\n   \nContinued on next page\n";
        let lines = normalize_pages(&[page], &ParserConfig::default());
        assert_eq!(texts(&lines), vec!["01/02/2024 Coffee 4.50"]);
        assert_eq!(lines[0].page_index, 0);
        assert_eq!(lines[0].line_index, 2);
    }

    #[test]
    fn test_keeps_boilerplate_when_disabled() {
        let cfg = ParserConfig {
            drop_boilerplate: false,
            ..Default::default()
        };
        let lines = normalize_pages(&["Page 1 of 1"], &cfg);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_rejoins_hyphenated_word() {
        let lines = normalize_pages(&["01/02/2024 Transfer to Sav-\nings 10.00"], &ParserConfig::default());
        assert_eq!(texts(&lines), vec!["01/02/2024 Transfer to Savings 10.00"]);
    }

    #[test]
    fn test_trailing_minus_amount_is_not_a_hyphen_break() {
        let lines = normalize_pages(&["01/02 Fee 120.47-\nreversal"], &ParserConfig::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_repeated_letterhead_kept_once() {
        let p1 = "FIRST NATIONAL BANK\n01/02/2024 Coffee 4.50\n01/03/2024 Tea 3.00";
        let p2 = "FIRST NATIONAL BANK\n01/04/2024 Lunch 12.00\n01/05/2024 Bus 2.75";
        let lines = normalize_pages(&[p1, p2], &ParserConfig::default());
        let count = lines.iter().filter(|l| l.text == "FIRST NATIONAL BANK").count();
        assert_eq!(count, 1);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[3].page_index, 1);
    }

    #[test]
    fn test_repeated_ledger_row_across_page_break_is_kept() {
        let p1 = "01/03/2024 Tea 3.00\n01/02/2024 Coffee 4.50";
        let p2 = "01/02/2024 Coffee 4.50\n01/04/2024 Lunch 12.00";
        let lines = normalize_pages(&[p1, p2], &ParserConfig::default());
        assert_eq!(lines.len(), 4);
        assert_eq!(lines.iter().filter(|l| l.text == "01/02/2024 Coffee 4.50").count(), 2);
    }

    #[test]
    fn test_empty_input() {
        let pages: [&str; 0] = [];
        assert!(normalize_pages(&pages, &ParserConfig::default()).is_empty());
        assert!(normalize_pages(&["\n\n"], &ParserConfig::default()).is_empty());
    }
}
