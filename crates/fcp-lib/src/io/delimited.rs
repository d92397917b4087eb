use anyhow::{bail, Context};
use csv::{ReaderBuilder, Trim};
use log::debug;
use std::fs;
use std::path::Path;

use crate::columns::ColumnResolver;
use crate::dataset::Dataset;
use crate::error::{FcpError, Result};
use crate::table::Table;

/// How to read a delimited cycler export.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// Field separator; sniffed from the first line when `None`.
    pub delimiter: Option<u8>,
    /// Parse `3,25` as `3.25`.
    pub decimal_comma: bool,
    pub resolver: ColumnResolver,
}

impl Default for LoadOptions {
    /// Tab-separated, decimal comma, no header row, fixed instrument column order.
    fn default() -> Self {
        Self {
            delimiter: Some(b'\t'),
            decimal_comma: true,
            resolver: ColumnResolver::default(),
        }
    }
}

impl LoadOptions {
    /// Header row resolved by pattern matching, delimiter sniffed, decimal point.
    pub fn auto_detect() -> Self {
        Self {
            delimiter: None,
            decimal_comma: false,
            resolver: ColumnResolver::Patterns,
        }
    }
}

/// Pick tab, semicolon or comma, in that order of preference, from the first non-empty line.
pub fn sniff_delimiter(text: &str) -> u8 {
    let first = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    [b'\t', b';', b',']
        .into_iter()
        .find(|d| first.as_bytes().contains(d))
        .unwrap_or(b'\t')
}

fn parse_value(raw: &str, decimal_comma: bool) -> Option<f64> {
    let value: f64 = if decimal_comma {
        raw.replace(',', ".").parse().ok()?
    } else {
        raw.parse().ok()?
    };
    value.is_finite().then_some(value)
}

/// Parse delimited text into a table named `name`.
pub fn parse_table(name: &str, text: &str, options: &LoadOptions) -> anyhow::Result<Table> {
    let delimiter = options.delimiter.unwrap_or_else(|| sniff_delimiter(text));
    debug!(
        "reading {} with delimiter {:?}, decimal comma: {}",
        name, delimiter as char, options.decimal_comma
    );
    let has_headers = options.resolver.reads_header();
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut headers: Vec<String> = if has_headers {
        reader
            .headers()
            .context("reading header row")?
            .iter()
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let row_no = idx + 1;
        let record = record.with_context(|| format!("reading data row {}", row_no))?;
        let mut row = Vec::with_capacity(record.len());
        for (col, raw) in record.iter().enumerate() {
            let value = parse_value(raw, options.decimal_comma).with_context(|| {
                format!(
                    "data row {}, column {}: '{}' is not a finite number",
                    row_no,
                    col + 1,
                    raw
                )
            })?;
            row.push(value);
        }
        rows.push(row);
    }
    let Some(first) = rows.first() else {
        bail!("no data rows");
    };
    if headers.is_empty() {
        headers = (1..=first.len()).map(|i| format!("column {}", i)).collect();
    }
    let table = Table::from_rows(name, headers, &rows)?;
    debug!(
        "loaded {} row(s) x {} column(s) from {}",
        table.row_count(),
        table.arity(),
        name
    );
    Ok(table)
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a delimited file from disk. Bytes that are not UTF-8 are replaced.
pub fn read_table(path: &Path, options: &LoadOptions) -> Result<Table> {
    let name = file_name(path);
    let loaded = fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))
        .and_then(|bytes| parse_table(&name, &String::from_utf8_lossy(&bytes), options));
    loaded.map_err(|err| FcpError::Load {
        file: name,
        reason: format!("{:#}", err),
    })
}

/// Read, resolve columns and wrap as a [`Dataset`].
pub fn load_dataset(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let table = read_table(path, options)?;
    let mapping = options.resolver.resolve(table.headers())?;
    Dataset::new(table, mapping)
}
