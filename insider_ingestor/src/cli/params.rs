use std::path::Path;

use anyhow::{Context, bail};

/// Splits `"AAA, BBB,,CCC"` into `["AAA", "BBB", "CCC"]`.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn read_symbols_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read symbols from {}", path.display()))?;
    Ok(content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default())
        .flat_map(parse_symbols)
        .collect())
}

pub fn symbols_from_args(
    symbols: Option<&str>,
    file: Option<&Path>,
) -> anyhow::Result<Vec<String>> {
    let list = match (symbols, file) {
        (Some(raw), _) => parse_symbols(raw),
        (None, Some(path)) => read_symbols_file(path)?,
        (None, None) => bail!("either --symbols or --symbols-file is required"),
    };
    if list.is_empty() {
        bail!("no symbols given");
    }
    Ok(list)
}
