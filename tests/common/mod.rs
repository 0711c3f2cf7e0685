#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use sp500_etl::errors::{EtlError, Result};
use sp500_etl::models::price::PriceHistory;
use sp500_etl::models::table::Table;
use sp500_etl::scrapers::base::{ConstituentSource, PriceSource};
use std::collections::HashMap;
use std::sync::Mutex;

pub const SOURCE_COLUMNS: [&str; 4] = ["Símbolo", "Seguridad", "Sector GICS", "Sub-industria GICS"];

/// Constituent table with the default source headers
pub fn constituent_table(rows: &[[Option<&str>; 4]]) -> Table {
    let mut table = Table::new(SOURCE_COLUMNS.iter().map(|s| s.to_string()).collect());
    for row in rows {
        table.push_row(row.iter().map(|c| c.map(String::from)).collect());
    }
    table
}

pub struct FakeConstituents {
    table: std::result::Result<Table, String>,
}

impl FakeConstituents {
    pub fn with_table(table: Table) -> Self {
        Self { table: Ok(table) }
    }

    pub fn failing(message: &str) -> Self {
        Self { table: Err(message.to_string()) }
    }
}

#[async_trait]
impl ConstituentSource for FakeConstituents {
    fn source_name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_constituents(&self, _url: &str) -> Result<Table> {
        match &self.table {
            Ok(table) => Ok(table.clone()),
            Err(message) => Err(EtlError::ParseError(message.clone())),
        }
    }
}

/// Serves canned histories; unknown tickers get an empty history
#[derive(Default)]
pub struct FakePrices {
    histories: HashMap<String, PriceHistory>,
    failing: Vec<String>,
    pub calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl FakePrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Daily closes starting on 2024-05-01, labelled like the chart source does
    pub fn with_closes(mut self, ticker: &str, closes: &[f64]) -> Self {
        let mut history = PriceHistory::new("")
            .with_column("Open", closes.iter().map(|c| Some(*c)).collect())
            .with_column("Close", closes.iter().map(|c| Some(*c)).collect());
        history.index = (0..closes.len())
            .map(|i| format!("2024-05-{:02} 09:30:00", i + 1))
            .collect();
        self.histories.insert(ticker.to_string(), history);
        self
    }

    pub fn with_history(mut self, ticker: &str, history: PriceHistory) -> Self {
        self.histories.insert(ticker.to_string(), history);
        self
    }

    pub fn with_failure(mut self, ticker: &str) -> Self {
        self.failing.push(ticker.to_string());
        self
    }

    pub fn called_tickers(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(t, _, _)| t.clone()).collect()
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    fn source_name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_price_history(&self, ticker: &str, start: &NaiveDate, end: &NaiveDate) -> Result<PriceHistory> {
        self.calls.lock().unwrap().push((ticker.to_string(), *start, *end));

        if self.failing.iter().any(|t| t == ticker) {
            return Err(EtlError::FetchError(format!("HTTP 404 Not Found for {}", ticker)));
        }

        Ok(self
            .histories
            .get(ticker)
            .cloned()
            .unwrap_or_else(|| PriceHistory::new(ticker)))
    }
}
