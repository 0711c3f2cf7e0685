use log::info;

use crate::models::company::ConstituentRecord;
use crate::models::price::PricePoint;
use crate::errors::Result;
use crate::util::csv_utils;
use std::collections::HashMap;
use std::path::Path;

/// 读取ETL输出的CSV文件，按代码和行业建立索引
pub struct PriceDataProvider {
    companies: Vec<ConstituentRecord>,
    prices: Vec<PricePoint>,
    // 索引用于快速查找
    ticker_index: HashMap<String, usize>,
    sector_index: HashMap<String, Vec<usize>>,
    price_index: HashMap<String, Vec<usize>>,
}

impl PriceDataProvider {
    /// Load the companies file and, when present, the prices file
    pub fn load_from_files(companies_path: &Path, prices_path: &Path) -> Result<Self> {
        let companies = csv_utils::read_records(companies_path)?;
        let prices = if prices_path.exists() {
            csv_utils::read_records(prices_path)?
        } else {
            info!("{} not found, no price data loaded", prices_path.display());
            Vec::new()
        };

        Ok(Self::new_with_data(companies, prices))
    }

    pub fn new_with_data(companies: Vec<ConstituentRecord>, prices: Vec<PricePoint>) -> Self {
        let mut provider = Self {
            companies,
            prices,
            ticker_index: HashMap::new(),
            sector_index: HashMap::new(),
            price_index: HashMap::new(),
        };

        provider.rebuild_indices();

        provider
    }

    pub fn get_all_companies(&self) -> &[ConstituentRecord] {
        &self.companies
    }

    pub fn get_company_by_ticker(&self, ticker: &str) -> Option<&ConstituentRecord> {
        self.ticker_index.get(ticker).map(|&idx| &self.companies[idx])
    }

    pub fn get_companies_by_sector(&self, sector: &str) -> Vec<&ConstituentRecord> {
        self.sector_index.get(sector)
            .map(|indices| indices.iter().map(|&idx| &self.companies[idx]).collect())
            .unwrap_or_default()
    }

    /// Price rows for `ticker` in file order
    pub fn get_prices_by_ticker(&self, ticker: &str) -> Vec<&PricePoint> {
        self.price_index.get(ticker)
            .map(|indices| indices.iter().map(|&idx| &self.prices[idx]).collect())
            .unwrap_or_default()
    }

    pub fn get_all_prices(&self) -> &[PricePoint] {
        &self.prices
    }

    /// Latest date across all price rows
    pub fn get_latest_trading_date(&self) -> Option<&str> {
        // YYYY-MM-DD 字符串可直接比较
        self.prices.iter().map(|p| p.date.as_str()).max()
    }

    fn rebuild_indices(&mut self) {
        self.ticker_index.clear();
        self.sector_index.clear();
        self.price_index.clear();

        for (i, company) in self.companies.iter().enumerate() {
            self.ticker_index.entry(company.ticker.clone()).or_insert(i);

            self.sector_index
                .entry(company.sector.clone())
                .or_insert_with(Vec::new)
                .push(i);
        }

        for (i, price) in self.prices.iter().enumerate() {
            self.price_index
                .entry(price.ticker.clone())
                .or_insert_with(Vec::new)
                .push(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(ticker: &str, sector: &str) -> ConstituentRecord {
        ConstituentRecord {
            ticker: ticker.into(),
            company: format!("{} Inc.", ticker),
            sector: sector.into(),
            subsector: "Other".into(),
        }
    }

    fn price(ticker: &str, date: &str, close: f64) -> PricePoint {
        PricePoint { date: date.into(), ticker: ticker.into(), close: Some(close) }
    }

    #[test]
    fn indexes_companies_and_prices() {
        let provider = PriceDataProvider::new_with_data(
            vec![company("AAA", "Tech"), company("BBB", "Energy"), company("CCC", "Tech")],
            vec![
                price("AAA", "2024-05-01", 1.0),
                price("BBB", "2024-05-03", 2.0),
                price("AAA", "2024-05-02", 1.5),
            ],
        );

        assert_eq!(provider.get_company_by_ticker("BBB").unwrap().sector, "Energy");
        assert!(provider.get_company_by_ticker("ZZZ").is_none());
        assert_eq!(provider.get_companies_by_sector("Tech").len(), 2);

        let aaa: Vec<&str> = provider.get_prices_by_ticker("AAA").iter().map(|p| p.date.as_str()).collect();
        assert_eq!(aaa, vec!["2024-05-01", "2024-05-02"]);
        assert_eq!(provider.get_latest_trading_date(), Some("2024-05-03"));
    }

    #[test]
    fn empty_provider_has_no_latest_date() {
        let provider = PriceDataProvider::new_with_data(Vec::new(), Vec::new());
        assert_eq!(provider.get_latest_trading_date(), None);
        assert!(provider.get_prices_by_ticker("AAA").is_empty());
    }
}
