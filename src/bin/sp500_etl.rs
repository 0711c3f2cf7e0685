use sp500_etl::config::Config;
use sp500_etl::data_provider::PriceDataProvider;
use sp500_etl::logging;
use sp500_etl::models::company::ConstituentRecord;
use sp500_etl::scrapers::wikipedia::WikipediaScraper;
use sp500_etl::scrapers::yahoo::YahooPriceSource;
use sp500_etl::services::etl_service::EtlService;
use sp500_etl::services::loader::{LoadTarget, Loader};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Arg, Command};
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let today = chrono::Local::now().format("%Y-%m-%d").to_string();

    // 创建基本的命令行应用
    let app = Command::new("sp500_etl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("S&P 500 constituents and prices: scrape, normalize, write CSV, load into SQL")
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .value_name("PATH")
                .help("Append log lines to this file ('-' logs to stderr)")
                .takes_value(true)
                .default_value("etl_process.log"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory holding the CSV files")
                .takes_value(true)
                .default_value("."),
        );

    // 在开发模式下添加调试参数
    #[cfg(debug_assertions)]
    let app = app
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug mode")
                .takes_value(false),
        )
        .arg(
            Arg::new("debug-limit")
                .long("debug-limit")
                .help("Limit the number of tickers to download in debug mode")
                .takes_value(true)
                .default_value("2"),
        );

    let app = app
        .subcommand(
            Command::new("extract")
                .about("Scrape constituents, download prices and write both CSV files")
                .arg(
                    Arg::new("url")
                        .short('u')
                        .long("url")
                        .value_name("URL")
                        .help("Page holding the constituent table")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("date")
                        .short('d')
                        .long("date")
                        .value_name("DATE")
                        .help("End of the price window, exclusive (YYYY-MM-DD)")
                        .takes_value(true)
                        .default_value(&today),
                )
                .arg(
                    Arg::new("window-days")
                        .long("window-days")
                        .value_name("DAYS")
                        .help("Length of the trailing price window")
                        .takes_value(true)
                        .default_value("90"),
                ),
        )
        .subcommand(
            Command::new("load")
                .about("Append the companies and company profile CSV files into the database")
                .arg(
                    Arg::new("database-url")
                        .long("database-url")
                        .value_name("URL")
                        .help("SQLite connection URL")
                        .takes_value(true)
                        .default_value("sqlite://sp500.db"),
                )
                .arg(
                    Arg::new("companies-key")
                        .long("companies-key")
                        .value_name("COLUMN")
                        .help("Rows of the companies file missing this column are dropped")
                        .takes_value(true)
                        .default_value("Date"),
                ),
        )
        .subcommand(
            Command::new("explore")
                .about("Show extracted constituents and prices")
                .arg(
                    Arg::new("ticker")
                        .short('t')
                        .long("ticker")
                        .value_name("TICKER")
                        .help("Ticker filter (substring)")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("sector")
                        .short('s')
                        .long("sector")
                        .value_name("SECTOR")
                        .help("Sector filter (exact, case-insensitive)")
                        .takes_value(true),
                )
                .arg(
                    Arg::new("limit")
                        .short('l')
                        .long("limit")
                        .value_name("LIMIT")
                        .help("Limit the number of records to display")
                        .takes_value(true)
                        .default_value("10"),
                ),
        );

    let matches = app.get_matches();

    #[cfg(debug_assertions)]
    let debug_mode = matches.is_present("debug");
    #[cfg(not(debug_assertions))]
    let debug_mode = false;

    #[cfg(debug_assertions)]
    let debug_ticker_limit = matches.value_of("debug-limit")
        .unwrap_or("2")
        .parse::<usize>()
        .unwrap_or(2);
    #[cfg(not(debug_assertions))]
    let debug_ticker_limit = usize::MAX;

    let config = Config::new()
        .with_output_dir(matches.value_of("output-dir").unwrap_or("."))
        .with_log_file(matches.value_of("log-file").filter(|p| *p != "-"))
        .with_show_progress(matches.value_of("log-file") != Some("-"))
        .with_debug_mode(debug_mode)
        .with_debug_ticker_limit(debug_ticker_limit);

    logging::init(config.log_file.as_deref())?;

    match matches.subcommand() {
        Some(("extract", m)) => {
            let date_str = m.value_of("date").unwrap_or(today.as_str());
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .with_context(|| format!("invalid --date '{}'", date_str))?;
            let window_days = m.value_of("window-days")
                .unwrap_or("90")
                .parse::<i64>()
                .context("invalid --window-days")?;

            let mut config = config.with_window_days(window_days);
            if let Some(url) = m.value_of("url") {
                config = config.with_source_url(url);
            }
            if config.debug_mode {
                info!("Debug mode enabled, limit {} tickers", config.debug_ticker_limit);
            }

            let constituents = Arc::new(WikipediaScraper::new(&config.table_selector)?);
            let prices = Arc::new(YahooPriceSource::new()?);
            let service = EtlService::new(config, constituents, prices);

            let summary = service.run(&date).await?;

            println!("Companies written: {} ({})", summary.companies, summary.companies_path.display());
            match &summary.prices_path {
                Some(path) => println!("Price rows written: {} ({})", summary.price_rows, path.display()),
                None => println!("No price data written"),
            }
            println!(
                "Tickers: {} processed, {} skipped, {} failed",
                summary.processed.len(),
                summary.skipped.len(),
                summary.failed.len()
            );
        }
        Some(("load", m)) => {
            let config = config
                .with_database_url(m.value_of("database-url").unwrap_or("sqlite://sp500.db"))
                .with_companies_key(m.value_of("companies-key").unwrap_or("Date"));

            let loader = Loader::connect(&config.database_url).await?;
            let targets = LoadTarget::from_config(&config);
            let result = loader.load(&targets).await;
            loader.close().await;

            let summary = match result {
                Ok(summary) => summary,
                Err(e) => {
                    error!("Load failed: {}", e);
                    return Err(e.into());
                }
            };

            for table in &summary.tables {
                println!(
                    "{}: {} rows appended ({} read, {} dropped)",
                    table.table, table.rows_appended, table.rows_read, table.rows_dropped
                );
            }
        }
        Some(("explore", m)) => {
            let ticker_filter = m.value_of("ticker");
            let sector_filter = m.value_of("sector");
            let limit = m.value_of("limit")
                .unwrap_or("10")
                .parse::<usize>()
                .unwrap_or(10);

            let provider = PriceDataProvider::load_from_files(&config.companies_path(), &config.prices_path())?;
            println!(
                "Found {} companies and {} price rows",
                provider.get_all_companies().len(),
                provider.get_all_prices().len()
            );
            if let Some(date) = provider.get_latest_trading_date() {
                println!("Latest trading date: {}", date);
            }

            // 过滤数据
            let filtered: Vec<&ConstituentRecord> = provider.get_all_companies().iter()
                .filter(|c| {
                    if let Some(ticker) = ticker_filter {
                        if !c.ticker.contains(ticker) {
                            return false;
                        }
                    }

                    if let Some(sector) = sector_filter {
                        if c.sector.to_lowercase() != sector.to_lowercase() {
                            return false;
                        }
                    }

                    true
                })
                .collect();

            println!("Filtered to {} companies", filtered.len());

            for company in filtered.iter().take(limit) {
                println!("{} ({}) - {} / {}", company.company, company.ticker, company.sector, company.subsector);
                println!("{:-<40}", "");

                let prices = provider.get_prices_by_ticker(&company.ticker);
                for point in prices.iter().take(limit) {
                    match point.close {
                        Some(close) => println!("{:<12} {:>10.2}", point.date, close),
                        None => println!("{:<12} {:>10}", point.date, "-"),
                    }
                }

                if prices.len() > limit {
                    println!("... and {} more records", prices.len() - limit);
                } else if prices.is_empty() {
                    println!("No price data available for this ticker");
                }
            }
        }
        _ => {
            println!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}
