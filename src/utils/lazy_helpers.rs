//! LazyFrame materialization helpers with column validation
//!
//! Upstream tables arrive as CSV or Parquet with loosely typed columns
//! (booleans as 0/1 or "Yes", lists as Arrow lists or pipe-separated
//! strings). These helpers validate the expected columns up front and pull
//! values out as plain Rust vectors.

use anyhow::{anyhow, Context, Result};
use polars::prelude::*;
use std::path::Path;

/// Scan a table: `.csv` through the CSV reader, anything else as Parquet
pub fn scan_table(path: &Path) -> Result<LazyFrame> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(10_000))
            .try_into_reader_with_file_path(Some(path.into()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load CSV: {:?}", path))?;
        Ok(df.lazy())
    } else {
        LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to scan parquet: {:?}", path))
    }
}

/// Materialize LazyFrame with required and optional columns
///
/// Every required column must exist; optional columns are selected only
/// when present.
///
/// # Errors
/// Returns error if a required column is missing or materialization fails.
pub fn materialize_with_columns(
    lazy: &LazyFrame,
    required: &[&str],
    optional: &[&str],
    context: &str,
) -> Result<DataFrame> {
    let schema = lazy
        .clone()
        .collect_schema()
        .with_context(|| format!("{}: Failed to resolve schema", context))?;

    for &expected in required {
        if !schema.contains(expected) {
            let available: Vec<String> = schema.iter_names().map(|s| s.to_string()).collect();
            return Err(anyhow!(
                "{}: Missing expected column '{}'. Available columns: {:?}",
                context, expected, available
            ));
        }
    }

    let col_exprs: Vec<Expr> = required
        .iter()
        .chain(optional.iter().filter(|&&c| schema.contains(c)))
        .map(|&name| col(name))
        .collect();

    lazy.clone()
        .select(&col_exprs)
        .collect()
        .with_context(|| format!("{}: Failed to materialize columns {:?}", context, required))
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// String column values; missing column yields all `None`
pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if !has_column(df, name) {
        return Ok(vec![None; df.height()]);
    }
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()
        .with_context(|| format!("Column '{}' is not string type", name))?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty() && *s != "NA").map(str::to_string))
        .collect();
    Ok(values)
}

/// Numeric column as f64 (ints and numeric strings cast; unparsable → None)
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if !has_column(df, name) {
        return Ok(vec![None; df.height()]);
    }
    let column = df
        .column(name)?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' cannot be read as numeric", name))?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" | "1.0" => Some(true),
        "false" | "f" | "no" | "n" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

/// Boolean column stored as bool, 0/1 or yes/no text
pub fn bool_values(df: &DataFrame, name: &str) -> Result<Vec<Option<bool>>> {
    if !has_column(df, name) {
        return Ok(vec![None; df.height()]);
    }
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Boolean => Ok(column.bool()?.into_iter().collect()),
        DataType::String => Ok(column
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_flag))
            .collect()),
        _ => Ok(f64_values(df, name)?
            .into_iter()
            .map(|v| v.map(|x| x != 0.0))
            .collect()),
    }
}

/// List-valued column as owned name lists
///
/// Accepts Arrow list columns and pipe-separated strings.
pub fn string_lists(df: &DataFrame, name: &str) -> Result<Vec<Vec<String>>> {
    let height = df.height();
    if !has_column(df, name) {
        return Ok(vec![Vec::new(); height]);
    }
    let column = df.column(name)?;
    let mut out = Vec::with_capacity(height);

    if let Ok(list_col) = column.list() {
        for idx in 0..height {
            let mut items = Vec::new();
            if let Some(list_series) = list_col.get_as_series(idx) {
                if let Ok(str_series) = list_series.str() {
                    items.extend(
                        str_series
                            .into_iter()
                            .flatten()
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string),
                    );
                }
            }
            out.push(items);
        }
    } else {
        for value in str_values(df, name)? {
            out.push(
                value
                    .map(|v| {
                        v.split('|')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            );
        }
    }
    Ok(out)
}
