use crate::config::Config;
use crate::models::company::ConstituentRecord;
use crate::models::price::{PriceHistory, PricePoint};
use crate::models::table::Table;
use crate::scrapers::base::{ConstituentSource, PriceSource};
use crate::services::transform::{self, COMPANY_HEADERS, PRICE_HEADERS};
use crate::errors::{Result, EtlError};
use crate::util::{self, csv_utils};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome of one extraction run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub companies: usize,
    /// Tickers whose prices made it into the prices file, in output order
    pub processed: Vec<String>,
    /// Tickers skipped because the price source returned nothing
    pub skipped: Vec<String>,
    /// Tickers whose price table could not be transformed
    pub failed: Vec<String>,
    pub price_rows: usize,
    pub companies_path: PathBuf,
    pub prices_path: Option<PathBuf>,
}

/// 抽取-转换-写出流程
pub struct EtlService {
    config: Config,
    constituent_source: Arc<dyn ConstituentSource + Send + Sync>,
    price_source: Arc<dyn PriceSource + Send + Sync>,
    progress: Option<ProgressBar>,
}

impl EtlService {
    pub fn new(
        config: Config,
        constituent_source: Arc<dyn ConstituentSource + Send + Sync>,
        price_source: Arc<dyn PriceSource + Send + Sync>,
    ) -> Self {
        Self {
            config,
            constituent_source,
            price_source,
            progress: None,
        }
    }

    /// Drive `pb` over the ticker loop instead of a bar built from the config
    pub fn with_progress_bar(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    /// Run the whole extraction flow with a price window ending at `today`.
    ///
    /// Constituent extraction, company transformation and file writes are
    /// fatal. Price failures only skip the ticker concerned.
    pub async fn run(&self, today: &NaiveDate) -> Result<RunSummary> {
        match self.run_stages(today).await {
            Ok(summary) => {
                info!("ETL process completed successfully");
                Ok(summary)
            }
            Err(e) => {
                error!("ETL process failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, today: &NaiveDate) -> Result<RunSummary> {
        let raw = self.extract_constituents().await?;
        let companies = self.transform_constituents(&raw)?;

        let companies_path = self.config.companies_path();
        write_stage(&companies_path, &COMPANY_HEADERS, &companies)?;

        let mut summary = RunSummary {
            companies: companies.len(),
            companies_path,
            ..RunSummary::default()
        };

        let (start, end) = util::price_window(*today, self.config.window_days);
        info!("Price window: {} to {} (end exclusive)", start, end);

        let mut tickers: Vec<String> = companies.into_iter().map(|c| c.ticker).collect();
        if self.config.debug_mode {
            util::limit_tickers(&mut tickers, self.config.debug_ticker_limit);
        }

        let pb = self.ticker_progress(tickers.len())?;
        let mut blocks = Vec::new();
        for ticker in &tickers {
            match self.extract_prices(ticker, &start, &end).await {
                Some(history) => match self.transform_price_history(&history) {
                    Ok(points) => {
                        summary.processed.push(ticker.clone());
                        blocks.push(points);
                    }
                    Err(e) => {
                        error!("Error transforming price data for {}: {}", ticker, e);
                        summary.failed.push(ticker.clone());
                    }
                },
                None => summary.skipped.push(ticker.clone()),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if blocks.is_empty() {
            warn!("No price data collected, {} not written", self.config.prices_file);
        } else {
            let prices = transform::concat_prices(blocks);
            let prices_path = self.config.prices_path();
            write_stage(&prices_path, &PRICE_HEADERS, &prices)?;
            summary.price_rows = prices.len();
            summary.prices_path = Some(prices_path);
        }

        info!(
            "Prices: {} tickers processed, {} skipped, {} failed",
            summary.processed.len(),
            summary.skipped.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    // 进度条：每个股票推进一格，无论成功、跳过还是失败
    fn ticker_progress(&self, total: usize) -> Result<ProgressBar> {
        if let Some(pb) = &self.progress {
            pb.set_length(total as u64);
            pb.set_position(0);
            return Ok(pb.clone());
        }

        if !self.config.show_progress {
            return Ok(ProgressBar::hidden());
        }

        let style = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
            .map_err(|e| EtlError::ConfigError(format!("Invalid progress template: {}", e)))?
            .progress_chars("#>-");

        let pb = ProgressBar::new(total as u64);
        pb.set_style(style);
        pb.set_message("Downloading price data");
        Ok(pb)
    }

    /// Fetch the constituent table from the configured URL
    pub async fn extract_constituents(&self) -> Result<Table> {
        info!(
            "Extracting constituents from {} ({})",
            self.config.source_url,
            self.constituent_source.source_name()
        );

        match self.constituent_source.fetch_constituents(&self.config.source_url).await {
            Ok(table) => {
                info!(
                    "Constituent extraction completed: {} rows, columns {:?}",
                    table.len(),
                    table.headers
                );
                Ok(table)
            }
            Err(e) => {
                error!("Error extracting constituents: {}", e);
                Err(e)
            }
        }
    }

    pub fn transform_constituents(&self, raw: &Table) -> Result<Vec<ConstituentRecord>> {
        match transform::transform_companies(raw, &self.config.company_columns) {
            Ok(records) => {
                info!(
                    "Constituent transformation completed: {} of {} rows kept",
                    records.len(),
                    raw.len()
                );
                Ok(records)
            }
            Err(e) => {
                error!("Error transforming constituents: {}", e);
                Err(e)
            }
        }
    }

    /// Fetch one ticker's prices; `None` when the source fails or returns no rows
    pub async fn extract_prices(&self, ticker: &str, start: &NaiveDate, end: &NaiveDate) -> Option<PriceHistory> {
        match self.price_source.fetch_price_history(ticker, start, end).await {
            Ok(history) if history.is_empty() => {
                error!("Error extracting price data for {}: no data found", ticker);
                None
            }
            Ok(mut history) => {
                history.ticker = ticker.to_string();
                info!(
                    "Price data for {} extracted from {} ({} rows)",
                    ticker,
                    self.price_source.source_name(),
                    history.len()
                );
                Some(history)
            }
            Err(e) => {
                error!("Error extracting price data for {}: {}", ticker, e);
                None
            }
        }
    }

    pub fn transform_price_history(&self, history: &PriceHistory) -> Result<Vec<PricePoint>> {
        let points = transform::transform_prices(history)?;
        info!("Price transformation for {} completed", history.ticker);
        Ok(points)
    }
}

fn write_stage<T: serde::Serialize>(path: &std::path::Path, headers: &[&str], records: &[T]) -> Result<()> {
    match csv_utils::write_records(path, headers, records) {
        Ok(()) => {
            info!("Saved {} rows to {}", records.len(), path.display());
            Ok(())
        }
        Err(e) => {
            error!("Error saving {}: {}", path.display(), e);
            Err(e)
        }
    }
}
