use std::path::PathBuf;

pub const DEFAULT_SOURCE_URL: &str =
    "https://es.wikipedia.org/wiki/Anexo:Compa%C3%B1%C3%ADas_del_S%26P_500";

/// Runtime configuration shared by the extraction flow and the loader
#[derive(Debug, Clone)]
pub struct Config {
    pub source_url: String,
    pub table_selector: String,
    /// Source headers for ticker, company, sector and subsector, in that order
    pub company_columns: [String; 4],
    pub window_days: i64,
    pub output_dir: PathBuf,
    pub companies_file: String,
    pub prices_file: String,
    pub profiles_file: String,
    pub log_file: Option<PathBuf>,
    pub database_url: String,
    pub profiles_key: String,
    pub profiles_year_column: String,
    pub companies_key: String,
    /// Draw a progress bar over the ticker downloads
    pub show_progress: bool,
    pub debug_mode: bool,
    pub debug_ticker_limit: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            table_selector: "table.wikitable.sortable".to_string(),
            company_columns: [
                "Símbolo".to_string(),
                "Seguridad".to_string(),
                "Sector GICS".to_string(),
                "Sub-industria GICS".to_string(),
            ],
            window_days: 90,
            output_dir: PathBuf::from("."),
            companies_file: "sp500_companies.csv".to_string(),
            prices_file: "sp500_stock_prices.csv".to_string(),
            profiles_file: "sp500_CompanyProfiles.csv".to_string(),
            log_file: Some(PathBuf::from("etl_process.log")),
            database_url: "sqlite://sp500.db".to_string(),
            profiles_key: "Symbol".to_string(),
            profiles_year_column: "FechaFundada".to_string(),
            companies_key: "Date".to_string(),
            show_progress: true,
            debug_mode: false,
            debug_ticker_limit: 2,
        }
    }

    pub fn with_source_url(mut self, url: &str) -> Self {
        self.source_url = url.to_string();
        self
    }

    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_days = days;
        self
    }

    pub fn with_output_dir(mut self, dir: &str) -> Self {
        self.output_dir = PathBuf::from(dir);
        self
    }

    pub fn with_log_file(mut self, path: Option<&str>) -> Self {
        self.log_file = path.map(PathBuf::from);
        self
    }

    pub fn with_database_url(mut self, url: &str) -> Self {
        self.database_url = url.to_string();
        self
    }

    pub fn with_companies_key(mut self, key: &str) -> Self {
        self.companies_key = key.to_string();
        self
    }

    pub fn with_show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn with_debug_ticker_limit(mut self, limit: usize) -> Self {
        self.debug_ticker_limit = limit;
        self
    }

    pub fn companies_path(&self) -> PathBuf {
        self.output_dir.join(&self.companies_file)
    }

    pub fn prices_path(&self) -> PathBuf {
        self.output_dir.join(&self.prices_file)
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.output_dir.join(&self.profiles_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
