use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use passbook_ingest::{DateOrder, ParserConfig, StatementParser, normalize_pages, reconcile};
use rust_decimal::Decimal;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod output;
mod state;

use config::{Config, OutputFormat};

#[derive(Parser, Debug)]
#[command(
    name = "passbook",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PASSBOOK_BUILD_SHA"), ")"),
    about = "Turn extracted bank-statement text into transactions"
)]
struct Cli {
    /// Config file (default: ~/.passbook/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ParserArgs {
    /// Text files extracted from one statement, in page order (form feeds split pages; - reads stdin)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Year for dates printed without one, when the statement never says
    #[arg(long)]
    year: Option<i32>,

    /// Read ambiguous numeric dates as month/day unless the statement proves otherwise
    #[arg(long)]
    month_first: bool,

    /// Lines that may extend a transaction description
    #[arg(long)]
    continuation_limit: Option<usize>,
}

impl ParserArgs {
    fn apply(&self, cfg: &mut ParserConfig) {
        if let Some(y) = self.year {
            cfg.fallback_year = Some(y);
        }
        if self.month_first {
            cfg.default_date_order = DateOrder::MonthFirst;
        }
        if let Some(n) = self.continuation_limit {
            cfg.continuation_limit = n;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a statement and print transactions, account info and unparsed lines
    Parse {
        #[command(flatten)]
        parser: ParserArgs,

        /// Output format (default from config: json)
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Check printed running balances against the parsed amounts
    Reconcile {
        #[command(flatten)]
        parser: ParserArgs,

        /// Allowed difference per row (default from config: 0.01)
        #[arg(long)]
        tolerance: Option<Decimal>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the normalized lines the parser sees, with page:line positions
    Lines {
        /// Text files extracted from one statement, in page order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Manage ~/.passbook/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config file if none exists
    Init,
    /// Print the effective config
    Show,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config_file = cli.config.as_deref();

    match cli.command {
        Command::Parse {
            parser,
            format,
            compact,
        } => {
            let cfg = config::load_config(config_file)?;
            let result = parse_inputs(&parser, &cfg)?;
            let stdout = io::stdout().lock();
            match format.unwrap_or(cfg.output.format) {
                OutputFormat::Json => output::write_json(stdout, &result, cfg.output.pretty && !compact)?,
                OutputFormat::Csv => output::write_csv(stdout, &result)?,
            }
        }

        Command::Reconcile {
            parser,
            tolerance,
            json,
        } => {
            let cfg = config::load_config(config_file)?;
            let result = parse_inputs(&parser, &cfg)?;
            let report = reconcile(&result, tolerance.unwrap_or(cfg.output.balance_tolerance));
            if !report.is_clean() {
                tracing::warn!(
                    mismatches = report.mismatches.len(),
                    closing_off = report.closing_delta.is_some(),
                    "running balances do not reconcile"
                );
            }
            let stdout = io::stdout().lock();
            if json {
                output::write_json(stdout, &report, cfg.output.pretty)?;
            } else {
                output::write_report(stdout, &result, &report)?;
            }
        }

        Command::Lines { inputs } => {
            let cfg = config::load_config(config_file)?;
            let pages = input::read_pages(&inputs)?;
            let lines = normalize_pages(&pages, &cfg.parser);
            output::write_lines(io::stdout().lock(), &lines)?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(config_file)?,
            ConfigCommand::Show => {
                let cfg = config::load_config(config_file)?;
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

fn parse_inputs(args: &ParserArgs, cfg: &Config) -> Result<passbook_ingest::ParseResult> {
    let mut parser_cfg = cfg.parser.clone();
    args.apply(&mut parser_cfg);

    let pages = input::read_pages(&args.inputs)?;
    let result = StatementParser::new(parser_cfg)
        .parse(&pages)
        .context("parse statement")?;

    tracing::info!(
        pages = pages.len(),
        transactions = result.transactions.len(),
        unparsed = result.unparsed_total,
        "parsed {}",
        args.inputs.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "passbook",
            "parse",
            "stmt.txt",
            "--year",
            "2023",
            "--month-first",
            "--continuation-limit",
            "1",
            "--format",
            "csv",
        ]);
        let Command::Parse { parser, format, .. } = cli.command else {
            panic!("expected parse");
        };
        let mut cfg = ParserConfig::default();
        parser.apply(&mut cfg);
        assert_eq!(cfg.fallback_year, Some(2023));
        assert_eq!(cfg.default_date_order, DateOrder::MonthFirst);
        assert_eq!(cfg.continuation_limit, 1);
        assert_eq!(format, Some(OutputFormat::Csv));
    }
}
