use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Daily bars for one ticker as returned by a price source.
///
/// `index` holds the provider's raw date labels; each entry of `columns`
/// runs parallel to it.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    pub ticker: String,
    pub index: Vec<String>,
    pub columns: HashMap<String, Vec<Option<f64>>>,
}

impl PriceHistory {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            index: Vec::new(),
            columns: HashMap::new(),
        }
    }

    pub fn with_column(mut self, name: &str, values: Vec<Option<f64>>) -> Self {
        self.columns.insert(name.to_string(), values);
        self
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// One normalized closing price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "Close")]
    pub close: Option<f64>,
}
