use anyhow::{Context, Result};
use passbook_ingest::{ParseResult, RawLine, ReconcileReport, Sign, Transaction};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: String,
    post_date: String,
    description: &'a str,
    amount: String,
    sign: &'static str,
    currency: &'a str,
    running_balance: String,
    page_index: usize,
    line_index: usize,
}

fn sign_label(sign: Sign) -> &'static str {
    match sign {
        Sign::Debit => "debit",
        Sign::Credit => "credit",
        Sign::Unknown => "unknown",
    }
}

impl<'a> CsvRow<'a> {
    fn from_transaction(t: &'a Transaction) -> Self {
        let first = t.source_lines.first();
        Self {
            date: t.date.format("%Y-%m-%d").to_string(),
            post_date: t.post_date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            description: &t.description,
            amount: t.amount.value.to_string(),
            sign: sign_label(t.amount.sign),
            currency: t.amount.currency.as_deref().unwrap_or(""),
            running_balance: t.running_balance.map(|b| b.to_string()).unwrap_or_default(),
            page_index: first.map_or(0, |l| l.page_index),
            line_index: first.map_or(0, |l| l.line_index),
        }
    }
}

pub fn write_json<W: Write, T: Serialize>(mut out: W, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut out, value).context("serialize json")?;
    } else {
        serde_json::to_writer(&mut out, value).context("serialize json")?;
    }
    writeln!(out).context("write output")?;
    Ok(())
}

/// One row per transaction; account metadata and diagnostics are not part of the CSV.
pub fn write_csv<W: Write>(out: W, result: &ParseResult) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    for t in &result.transactions {
        wtr.serialize(CsvRow::from_transaction(t)).context("write csv row")?;
    }
    wtr.flush().context("flush csv")?;
    Ok(())
}

pub fn write_lines<W: Write>(mut out: W, lines: &[RawLine]) -> Result<()> {
    for l in lines {
        writeln!(out, "{:>3}:{:<4} {}", l.page_index, l.line_index, l.text).context("write output")?;
    }
    Ok(())
}

pub fn write_report<W: Write>(mut out: W, result: &ParseResult, report: &ReconcileReport) -> Result<()> {
    writeln!(out, "Transactions: {}", result.transactions.len())?;
    if let Some(open) = result.account.opening_balance {
        writeln!(out, "Opening balance: {open}")?;
    }
    if let Some(close) = result.account.closing_balance {
        writeln!(out, "Closing balance: {close}")?;
    }

    if report.is_clean() {
        writeln!(out, "Running balances reconcile.")?;
        return Ok(());
    }

    for m in &report.mismatches {
        writeln!(
            out,
            "#{} {} {} | amount={} prev={} expected={} printed={} delta={}",
            m.index,
            m.date,
            m.description,
            m.amount,
            m.previous_balance,
            m.expected_balance,
            m.provided_balance,
            m.delta
        )?;
    }
    if let Some(delta) = report.closing_delta {
        writeln!(out, "Closing balance differs from last running balance by {delta}")?;
    }
    Ok(())
}
