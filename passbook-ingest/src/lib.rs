//! passbook-ingest: turns text extracted from bank-statement PDFs into
//! transactions, account metadata and a sample of the lines it could not use.
//!
//! The pipeline is normalize → probe/classify → assemble, driven once per
//! document by [`StatementParser`]. Nothing here does I/O.

pub mod assemble;
pub mod classify;
pub mod config;
pub mod driver;
pub mod error;
pub mod extractors;
pub mod hints;
pub mod normalize;
pub mod reconcile;
pub mod types;

pub use config::ParserConfig;
pub use driver::{StatementParser, parse_statement};
pub use error::{IngestError, Result};
pub use normalize::normalize_pages;
pub use reconcile::{BalanceMismatch, ReconcileReport, balance_mismatches, reconcile};
pub use types::{
    AccountInfo, AccountKind, DateOrder, ParseResult, ParsedAmount, RawLine, Sign, Transaction,
    UnparsedReason, UnparsedSample,
};
