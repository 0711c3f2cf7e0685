use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use log::info;
use crate::errors::{Result, EtlError};
use std::collections::HashMap;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// pandas 默认识别为缺失值的字符串
const MISSING_MARKERS: [&str; 8] = ["NA", "N/A", "NaN", "nan", "NULL", "null", "#N/A", "None"];

/// Whether a raw cell counts as a missing value
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed)
}

/// Map a raw cell to `None` when it is missing
pub fn cell_value(cell: &str) -> Option<String> {
    if is_missing(cell) {
        None
    } else {
        Some(cell.to_string())
    }
}

/// Reformat a provider date label as `YYYY-MM-DD`.
///
/// Already-normalized input comes back unchanged.
pub fn normalize_date(label: &str) -> Result<String> {
    let s = label.trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date.format(DATE_FORMAT).to_string());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date().format(DATE_FORMAT).to_string());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive().format(DATE_FORMAT).to_string());
    }

    if s.len() == 8 {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y%m%d") {
            return Ok(date.format(DATE_FORMAT).to_string());
        }
    }

    Err(EtlError::TransformError(format!("Invalid date label: {}", label)))
}

/// First four characters of a founding-date cell
pub fn year_prefix(value: &str) -> String {
    value.chars().take(4).collect()
}

/// Rename repeated header names to `name.1`, `name.2`, ...
///
/// A generated name that clashes with a later header keeps counting up.
pub fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            let mut name = header;
            let mut seen = counts.get(&name).copied().unwrap_or(0);
            while seen > 0 {
                counts.insert(name.clone(), seen + 1);
                name = format!("{}.{}", name, seen);
                seen = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), seen + 1);
            name
        })
        .collect()
}

/// Trailing price window ending today, end exclusive
pub fn price_window(today: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(days), today)
}

// 调试模式下限制处理的股票数量
pub fn limit_tickers(tickers: &mut Vec<String>, max_tickers: usize) {
    if tickers.len() > max_tickers {
        info!("DEBUG MODE: Processing only {} out of {} tickers", max_tickers, tickers.len());
        tickers.truncate(max_tickers);
    }
}

// CSV读写工具
pub mod csv_utils {
    use super::*;
    use crate::models::table::Table;
    use serde::de::DeserializeOwned;
    use serde::Serialize;
    use std::fs;
    use std::path::Path;

    /// Write records under an explicit header row.
    ///
    /// The header is written even when `records` is empty.
    pub fn write_records<T: Serialize>(path: &Path, headers: &[&str], records: &[T]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        writer.write_record(headers)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(())
    }

    /// Read a whole CSV file into a `Table`, mapping missing markers to `None`
    pub fn read_table(path: &Path) -> Result<Table> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = Table::new(dedupe_headers(headers));

        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(cell_value).collect());
        }

        Ok(table)
    }

    /// Deserialize every row of a CSV file
    pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut records = Vec::new();
        for record in reader.deserialize() {
            records.push(record?);
        }
        Ok(records)
    }
}
