//! Polars-backed reader for large exports, enabled with the `polars` feature.

use anyhow::{bail, Context};
use log::debug;
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::dataset::Dataset;
use crate::error::{FcpError, Result};
use crate::io::delimited::{file_name, sniff_delimiter, LoadOptions};
use crate::table::Table;

fn first_line(path: &Path) -> anyhow::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();
    while line.trim().is_empty() {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
    }
    Ok(line)
}

fn read_frame(path: &Path, options: &LoadOptions) -> anyhow::Result<Table> {
    let delimiter = match options.delimiter {
        Some(d) => d,
        None => sniff_delimiter(&first_line(path)?),
    };
    let has_header = options.resolver.reads_header();
    let parse = CsvParseOptions::default()
        .with_separator(delimiter)
        .with_decimal_comma(options.decimal_comma);
    let df = CsvReadOptions::default()
        .with_has_header(has_header)
        .with_parse_options(parse)
        .try_into_reader_with_file_path(Some(path.into()))?
        .finish()?;
    if df.height() == 0 {
        bail!("no data rows");
    }
    let headers: Vec<String> = if has_header {
        df.get_column_names()
            .iter()
            .map(|name| name.trim().to_string())
            .collect()
    } else {
        (1..=df.width()).map(|i| format!("column {}", i)).collect()
    };
    let mut columns = Vec::with_capacity(df.width());
    for (col, series) in df.get_columns().iter().enumerate() {
        let values = series
            .strict_cast(&DataType::Float64)
            .with_context(|| format!("column {} is not numeric", col + 1))?;
        let mut column = Vec::with_capacity(values.len());
        for (idx, value) in values.f64()?.into_iter().enumerate() {
            match value {
                Some(v) if v.is_finite() => column.push(v),
                _ => bail!(
                    "data row {}, column {}: not a finite number",
                    idx + 1,
                    col + 1
                ),
            }
        }
        columns.push(column);
    }
    Ok(Table::from_columns(file_name(path), headers, columns)?)
}

/// Same contract as [`crate::io::read_table`], parsed by polars.
pub fn read_table_polars(path: &Path, options: &LoadOptions) -> Result<Table> {
    let name = file_name(path);
    debug!("reading {} through polars", name);
    read_frame(path, options).map_err(|err| FcpError::Load {
        file: name,
        reason: format!("{:#}", err),
    })
}

pub fn load_dataset_polars(path: &Path, options: &LoadOptions) -> Result<Dataset> {
    let table = read_table_polars(path, options)?;
    let mapping = options.resolver.resolve(table.headers())?;
    Dataset::new(table, mapping)
}
