use anyhow::{Context, Result, bail};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Page separator emitted by `pdftotext` and most other extractors.
const FORM_FEED: char = '\x0c';

/// Split extracted text into pages. A trailing form feed does not open an empty page.
pub fn split_pages(text: &str) -> Vec<String> {
    let trimmed = text.strip_suffix(FORM_FEED).unwrap_or(text);
    trimmed.split(FORM_FEED).map(str::to_string).collect()
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("read stdin")?;
        return Ok(s);
    }
    if !path.exists() {
        bail!("input not found: {}", path.display());
    }
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// Pages of one statement, in order. Several files are treated as
/// consecutive pages of the same document.
pub fn read_pages(paths: &[PathBuf]) -> Result<Vec<String>> {
    if paths.is_empty() {
        bail!("no input files (pass one or more text files, or - for stdin)");
    }

    let mut pages = Vec::new();
    for path in paths {
        let text = read_source(path)?;
        let before = pages.len();
        pages.extend(split_pages(&text));
        tracing::debug!(path = %path.display(), pages = pages.len() - before, "read input");
    }
    Ok(pages)
}
