use crate::models::price::PriceHistory;
use crate::models::table::Table;
use crate::errors::{Result, EtlError};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;

/// Source of the index constituent table
#[async_trait]
pub trait ConstituentSource {
    /// Short name used in log lines
    fn source_name(&self) -> &'static str;

    /// Fetch the constituent table, keyed by the page's header text
    async fn fetch_constituents(&self, url: &str) -> Result<Table>;
}

/// Source of daily price history
#[async_trait]
pub trait PriceSource {
    fn source_name(&self) -> &'static str;

    /// Fetch daily bars for `ticker` in `[start, end)`.
    /// An empty history is a valid answer, not an error.
    async fn fetch_price_history(&self, ticker: &str, start: &NaiveDate, end: &NaiveDate) -> Result<PriceHistory>;
}

/// Map a non-2xx response status to a fetch error naming `what`
pub fn ensure_success(status: StatusCode, what: &str) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(EtlError::FetchError(format!("{} returned HTTP {}", what, status)))
    }
}
