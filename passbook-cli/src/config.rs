use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use passbook_ingest::ParserConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{ensure_passbook_home, passbook_home};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub output: OutputSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub format: OutputFormat,
    pub pretty: bool,
    /// Largest running-balance difference `reconcile` lets through.
    pub balance_tolerance: Decimal,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            pretty: true,
            balance_tolerance: Decimal::new(1, 2),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(passbook_home()?.join("config.toml"))
}

/// Load `explicit` if given (it must exist), else `~/.passbook/config.toml`
/// when present, else defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let p = match explicit {
        Some(p) if !p.exists() => bail!("config not found: {}", p.display()),
        Some(p) => p.to_path_buf(),
        None => config_path()?,
    };
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config, path: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn init_config(explicit: Option<&Path>) -> Result<()> {
    let p = match explicit {
        Some(p) => p.to_path_buf(),
        None => ensure_passbook_home()?.join("config.toml"),
    };
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use passbook_ingest::DateOrder;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[parser]
default_date_order = "month_first"
fallback_year = 2024

[output]
format = "csv"
"#,
        )
        .unwrap();
        assert_eq!(cfg.parser.default_date_order, DateOrder::MonthFirst);
        assert_eq!(cfg.parser.fallback_year, Some(2024));
        assert_eq!(cfg.parser.continuation_limit, 3);
        assert_eq!(cfg.output.format, OutputFormat::Csv);
        assert!(cfg.output.pretty);
    }

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        init_config(Some(&path)).unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
