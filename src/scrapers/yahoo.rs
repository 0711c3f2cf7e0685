//! Yahoo Finance price source.
//!
//! Reads daily bars from the v8 chart endpoint. Yahoo has no official API and
//! changes its response format without notice, so parsing is kept lenient:
//! missing arrays deserialize as empty and a range without trading days is
//! an empty history rather than an error.

use crate::models::price::PriceHistory;
use crate::errors::{Result, EtlError};
use crate::scrapers::base::{ensure_success, PriceSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// 雅虎财经日线数据源
pub struct YahooPriceSource {
    client: Client,
    base_url: String,
}

impl YahooPriceSource {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(EtlError::RequestError)?;

        Ok(Self::with_client(client, CHART_URL))
    }

    /// Use `client` against a chart endpoint other than Yahoo's
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn chart_url(&self, ticker: &str, start: &NaiveDate, end: &NaiveDate) -> String {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&includeAdjustedClose=true",
            self.base_url, ticker, period1, period2
        )
    }
}

/// Turn a chart response into a `PriceHistory` tagged with `ticker`.
///
/// Index labels are exchange-local `YYYY-MM-DD HH:MM:SS` timestamps.
pub(crate) fn parse_chart_response(ticker: &str, resp: ChartResponse) -> Result<PriceHistory> {
    let data = match resp.chart.result {
        Some(result) => result.into_iter().next(),
        None => {
            return Err(match resp.chart.error {
                Some(err) => EtlError::FetchError(format!("{}: {}: {}", ticker, err.code, err.description)),
                None => EtlError::FetchError(format!("{}: empty chart result", ticker)),
            });
        }
    };

    let mut history = PriceHistory::new(ticker);
    let data = match data {
        Some(data) => data,
        None => return Ok(history),
    };

    let timestamps = data.timestamp.unwrap_or_default();
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut open = Vec::with_capacity(timestamps.len());
    let mut high = Vec::with_capacity(timestamps.len());
    let mut low = Vec::with_capacity(timestamps.len());
    let mut close = Vec::with_capacity(timestamps.len());
    let mut adj_close = Vec::with_capacity(timestamps.len());
    let mut volume = Vec::with_capacity(timestamps.len());

    for (i, &ts) in timestamps.iter().enumerate() {
        let bar_open = quote.open.get(i).copied().flatten();
        let bar_high = quote.high.get(i).copied().flatten();
        let bar_low = quote.low.get(i).copied().flatten();
        let bar_close = quote.close.get(i).copied().flatten();
        let bar_volume = quote.volume.get(i).copied().flatten();

        // 全部为空的K线是非交易日
        if bar_open.is_none()
            && bar_high.is_none()
            && bar_low.is_none()
            && bar_close.is_none()
            && bar_volume.is_none()
        {
            continue;
        }

        let local = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| EtlError::FetchError(format!("{}: invalid timestamp {}", ticker, ts)))?;

        history.index.push(local.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string());
        open.push(bar_open);
        high.push(bar_high);
        low.push(bar_low);
        close.push(bar_close);
        volume.push(bar_volume);
        adj_close.push(adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten()));
    }

    Ok(history
        .with_column("Open", open)
        .with_column("High", high)
        .with_column("Low", low)
        .with_column("Close", close)
        .with_column("Adj Close", adj_close)
        .with_column("Volume", volume))
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn source_name(&self) -> &'static str {
        "yahoo_finance"
    }

    async fn fetch_price_history(&self, ticker: &str, start: &NaiveDate, end: &NaiveDate) -> Result<PriceHistory> {
        let url = self.chart_url(ticker, start, end);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        ensure_success(response.status(), &format!("Chart request for {}", ticker))?;

        let chart: ChartResponse = response.json().await?;
        let history = parse_chart_response(ticker, chart)?;

        debug!("Received {} bars for {}", history.len(), ticker);
        Ok(history)
    }
}
