//! Statement extraction driver: normalizes, classifies and assembles one document.

use tracing::{debug, trace};

use crate::assemble::Assembler;
use crate::classify::{ClassifierState, LineProbe, Route, probe_line};
use crate::config::ParserConfig;
use crate::error::{IngestError, Result};
use crate::extractors::{BalanceKind, classify_account_kind};
use crate::hints::DocumentHints;
use crate::normalize::normalize_pages;
use crate::types::{AccountInfo, ParseResult, RawLine, UnparsedReason, UnparsedSample};

/// Parse with the default configuration.
pub fn parse_statement<S: AsRef<str>>(pages: &[S]) -> Result<ParseResult> {
    StatementParser::default().parse(pages)
}

#[derive(Debug, Clone, Default)]
pub struct StatementParser {
    config: ParserConfig,
}

/// Bounded store of noise lines; everything past the cap is only counted.
struct UnparsedSink {
    cap: usize,
    samples: Vec<UnparsedSample>,
    total: usize,
}

impl UnparsedSink {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            samples: Vec::new(),
            total: 0,
        }
    }

    fn record(&mut self, line: &RawLine, reason: UnparsedReason) {
        self.total += 1;
        if self.samples.len() < self.cap {
            self.samples.push(UnparsedSample::from_line(line, reason));
        }
    }

    fn dropped(&self) -> usize {
        self.total - self.samples.len()
    }
}

impl StatementParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Extract everything from one statement's page texts, in page order.
    ///
    /// Only an empty page list is an error; a document with no usable lines
    /// comes back as an empty result.
    pub fn parse<S: AsRef<str>>(&self, pages: &[S]) -> Result<ParseResult> {
        if pages.is_empty() {
            return Err(IngestError::InvalidInput("no pages to parse".to_string()));
        }

        let lines = normalize_pages(pages, &self.config);
        let hints = DocumentHints::scan(&lines, &self.config);

        let mut account = AccountInfo::default();
        let mut assembler = Assembler::new(&self.config, &hints);
        let mut unparsed = UnparsedSink::new(self.config.unparsed_cap);
        let mut state = ClassifierState::default();

        for line in &lines {
            let probe = probe_line(&line.text, self.config.max_amount);
            let (next, route) = state.step(&probe);
            trace!(
                page = line.page_index,
                line = line.line_index,
                ?state,
                ?next,
                ?route,
                "classified line"
            );
            state = next;

            match route {
                Route::Transaction => {
                    let pushed = match probe.transaction.as_ref() {
                        Some(row) => assembler.push_transaction(line, row),
                        None => Err(probe.noise_reason()),
                    };
                    if let Err(reason) = pushed {
                        assembler.seal();
                        unparsed.record(line, reason);
                    }
                }
                Route::AccountInfo => {
                    assembler.seal();
                    absorb_account_line(&probe, &hints, &mut account, &mut assembler);
                }
                Route::SectionHeader => assembler.seal(),
                Route::Continuation => {
                    if !assembler.push_continuation(line) {
                        assembler.seal();
                        unparsed.record(line, UnparsedReason::UnrecognizedFormat);
                    }
                }
                Route::Noise(reason) => {
                    assembler.seal();
                    unparsed.record(line, reason);
                }
            }
        }

        let transactions = assembler.finish();
        let unparsed_dropped = unparsed.dropped();
        debug!(
            lines = lines.len(),
            transactions = transactions.len(),
            unparsed = unparsed.total,
            dropped = unparsed_dropped,
            date_order = ?hints.order,
            established = hints.order_established,
            "parsed statement"
        );

        Ok(ParseResult {
            account,
            transactions,
            unparsed_samples: unparsed.samples,
            unparsed_total: unparsed.total,
            unparsed_dropped,
            date_order: hints.order,
            date_order_established: hints.order_established,
        })
    }
}

/// Fold one account-info line into `account`; opening and forward balances
/// also seed the assembler's balance chain.
fn absorb_account_line(
    probe: &LineProbe,
    hints: &DocumentHints,
    account: &mut AccountInfo,
    assembler: &mut Assembler<'_>,
) {
    let mut found = AccountInfo {
        account_number: probe.account.account_number.clone(),
        holder_name: probe.account.holder_name.clone(),
        ..Default::default()
    };

    if let Some((name, number)) = &probe.account.header {
        found.account_kind = classify_account_kind(name);
        found.account_name = Some(name.clone());
        if found.account_number.is_none() {
            found.account_number = Some(number.clone());
        }
    }

    if let Some((start, end)) = &probe.account.period {
        if let (Some(start), Some(end)) = (hints.resolve(start), hints.resolve(end)) {
            if start <= end {
                found.period_start = Some(start);
                found.period_end = Some(end);
            }
        }
    }

    for marker in &probe.markers {
        match marker.kind {
            BalanceKind::Opening | BalanceKind::Forward => {
                if found.opening_balance.is_none() {
                    found.opening_balance = Some(marker.balance());
                }
                assembler.anchor_balance(marker.balance());
            }
            BalanceKind::Closing => {
                if found.closing_balance.is_none() {
                    found.closing_balance = Some(marker.balance());
                }
            }
        }
    }

    account.merge(found);
}
