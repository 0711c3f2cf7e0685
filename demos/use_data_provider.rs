use sp500_etl::config::Config;
use sp500_etl::data_provider::PriceDataProvider;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new();

    // 读取上一次 extract 生成的文件
    let provider = PriceDataProvider::load_from_files(&config.companies_path(), &config.prices_path())?;

    match provider.get_latest_trading_date() {
        Some(date) => println!("Latest trading date: {}", date),
        None => println!("No price data available"),
    }

    let ticker = "MMM";
    if let Some(company) = provider.get_company_by_ticker(ticker) {
        println!("\n{} ({})", company.company, company.ticker);
        println!("Sector: {} / {}", company.sector, company.subsector);

        let prices = provider.get_prices_by_ticker(ticker);
        println!("Price rows: {}", prices.len());

        println!("\nLast 5 closes:");
        println!("{:<12} {:>10}", "Date", "Close");
        println!("{:-<23}", "");
        for point in prices.iter().rev().take(5) {
            match point.close {
                Some(close) => println!("{:<12} {:>10.2}", point.date, close),
                None => println!("{:<12} {:>10}", point.date, "-"),
            }
        }
    } else {
        println!("Ticker not found: {}", ticker);
    }

    let tech = provider.get_companies_by_sector("Tecnología de la información");
    println!("\nInformation technology constituents: {}", tech.len());
    println!("Total constituents: {}", provider.get_all_companies().len());

    Ok(())
}
