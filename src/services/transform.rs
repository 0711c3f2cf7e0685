use crate::models::company::ConstituentRecord;
use crate::models::price::{PriceHistory, PricePoint};
use crate::models::table::Table;
use crate::errors::{Result, EtlError};
use crate::util::normalize_date;

pub const COMPANY_HEADERS: [&str; 4] = ["Ticker", "Company", "Sector", "Subsector"];
pub const PRICE_HEADERS: [&str; 3] = ["Date", "Ticker", "Close"];

/// Project the four source columns into constituent records.
///
/// `columns` names the source headers for ticker, company, sector and
/// subsector. Rows with a missing value in any of them are dropped.
pub fn transform_companies(raw: &Table, columns: &[String; 4]) -> Result<Vec<ConstituentRecord>> {
    let mut positions = [0usize; 4];
    for (slot, name) in positions.iter_mut().zip(columns.iter()) {
        *slot = raw.column_index(name).ok_or_else(|| {
            EtlError::SchemaError(format!(
                "Column '{}' not found, available columns: {:?}",
                name, raw.headers
            ))
        })?;
    }

    let records = raw
        .rows
        .iter()
        .filter_map(|row| {
            let ticker = row.get(positions[0])?.as_ref()?;
            let company = row.get(positions[1])?.as_ref()?;
            let sector = row.get(positions[2])?.as_ref()?;
            let subsector = row.get(positions[3])?.as_ref()?;
            Some(ConstituentRecord {
                ticker: ticker.clone(),
                company: company.clone(),
                sector: sector.clone(),
                subsector: subsector.clone(),
            })
        })
        .collect();

    Ok(records)
}

/// Flatten one ticker's history into `(Date, Ticker, Close)` rows
pub fn transform_prices(history: &PriceHistory) -> Result<Vec<PricePoint>> {
    if history.ticker.is_empty() {
        return Err(EtlError::TransformError("Price history is not tagged with a ticker".to_string()));
    }

    let close = history.column("Close").ok_or_else(|| {
        EtlError::TransformError(format!("{}: column 'Close' not found", history.ticker))
    })?;

    if close.len() != history.index.len() {
        return Err(EtlError::TransformError(format!(
            "{}: 'Close' has {} values for {} dates",
            history.ticker,
            close.len(),
            history.index.len()
        )));
    }

    history
        .index
        .iter()
        .zip(close)
        .map(|(label, value)| {
            Ok(PricePoint {
                date: normalize_date(label)?,
                ticker: history.ticker.clone(),
                close: *value,
            })
        })
        .collect()
}

/// Concatenate per-ticker blocks in the order given, without sorting
pub fn concat_prices(blocks: Vec<Vec<PricePoint>>) -> Vec<PricePoint> {
    let total = blocks.iter().map(Vec::len).sum();
    let mut all = Vec::with_capacity(total);
    for block in blocks {
        all.extend(block);
    }
    all
}
