use sp500_etl::config::Config;
use sp500_etl::errors::EtlError;
use sp500_etl::services::loader::{LoadTarget, Loader};
use sqlx::SqlitePool;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const PROFILES_CSV: &str = "\
Symbol,Name,FechaFundada
MMM,3M,1902-01-01
,Ghost,1950
AOS,A. O. Smith,
OLD,Old Co,c. 1850
";

const COMPANIES_CSV: &str = "\
Date,Ticker,Close
2024-05-01,AAA,10.5
,AAA,11
2024-05-02,BBB,
NaN,CCC,3
";

fn workspace(profiles: &str, companies: &str) -> (TempDir, Config) {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("sp500_CompanyProfiles.csv"), profiles).unwrap();
    std::fs::write(dir.path().join("sp500_companies.csv"), companies).unwrap();
    let config = Config::new().with_output_dir(dir.path().to_str().unwrap());
    (dir, config)
}

async fn connect(dir: &Path) -> Loader {
    let url = format!("sqlite://{}", dir.join("sp500.db").display());
    Loader::connect(&url).await.unwrap()
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{}\"", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn table_exists(pool: &SqlitePool, table: &str) -> bool {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table)
        .fetch_one(pool)
        .await
        .unwrap();
    n > 0
}

#[tokio::test]
async fn rows_without_key_are_not_appended() {
    let (dir, config) = workspace(PROFILES_CSV, COMPANIES_CSV);
    let loader = connect(dir.path()).await;

    let summary = loader.load(&LoadTarget::from_config(&config)).await.unwrap();

    // profiles: 4 rows, 1 without Symbol; companies: 4 rows, 2 without Date
    assert_eq!(summary.tables.len(), 2);
    assert_eq!(summary.tables[0].table, "CompanyProfiles");
    assert_eq!(summary.tables[0].rows_read, 4);
    assert_eq!(summary.tables[0].rows_dropped, 1);
    assert_eq!(summary.tables[0].rows_appended, 3);
    assert_eq!(summary.tables[1].rows_appended, 2);

    assert_eq!(count(loader.pool(), "CompanyProfiles").await, 3);
    assert_eq!(count(loader.pool(), "Companies").await, 2);

    loader.close().await;
}

#[tokio::test]
async fn founding_dates_keep_year_prefix() {
    let (dir, config) = workspace(PROFILES_CSV, COMPANIES_CSV);
    let loader = connect(dir.path()).await;

    loader.load(&LoadTarget::from_config(&config)).await.unwrap();

    let years: Vec<Option<String>> =
        sqlx::query_scalar("SELECT FechaFundada FROM CompanyProfiles ORDER BY rowid")
            .fetch_all(loader.pool())
            .await
            .unwrap();
    assert_eq!(years, vec![Some("1902".to_string()), None, Some("c. 1".to_string())]);

    let closes: Vec<Option<String>> = sqlx::query_scalar("SELECT Close FROM Companies ORDER BY rowid")
        .fetch_all(loader.pool())
        .await
        .unwrap();
    assert_eq!(closes, vec![Some("10.5".to_string()), None]);

    loader.close().await;
}

#[tokio::test]
async fn loading_twice_appends_twice() {
    let (dir, config) = workspace(PROFILES_CSV, COMPANIES_CSV);
    let loader = connect(dir.path()).await;
    let targets = LoadTarget::from_config(&config);

    loader.load(&targets).await.unwrap();
    loader.load(&targets).await.unwrap();

    assert_eq!(count(loader.pool(), "CompanyProfiles").await, 6);
    assert_eq!(count(loader.pool(), "Companies").await, 4);

    loader.close().await;
}

#[tokio::test]
async fn failed_append_rolls_back_both_tables() {
    let (dir, config) = workspace(PROFILES_CSV, COMPANIES_CSV);
    let loader = connect(dir.path()).await;

    sqlx::query("CREATE TABLE Companies (Foo TEXT)")
        .execute(loader.pool())
        .await
        .unwrap();

    let err = loader.load(&LoadTarget::from_config(&config)).await.unwrap_err();

    assert!(matches!(err, EtlError::LoadError(_)));
    assert!(!table_exists(loader.pool(), "CompanyProfiles").await);
    assert_eq!(count(loader.pool(), "Companies").await, 0);

    loader.close().await;
}

#[tokio::test]
async fn missing_key_column_fails_before_touching_the_database() {
    // the companies file written by the extraction flow has no Date column
    let (dir, config) = workspace(PROFILES_CSV, "Ticker,Company,Sector,Subsector\nAAA,X Corp,Tech,Software\n");
    let loader = connect(dir.path()).await;

    let err = loader.load(&LoadTarget::from_config(&config)).await.unwrap_err();
    assert!(matches!(err, EtlError::SchemaError(msg) if msg.contains("Date")));
    assert!(!table_exists(loader.pool(), "CompanyProfiles").await);

    let summary = loader
        .load(&LoadTarget::from_config(&config.with_companies_key("Ticker")))
        .await
        .unwrap();
    assert_eq!(summary.tables[1].rows_appended, 1);

    loader.close().await;
}

#[tokio::test]
async fn numeric_founding_dates_are_kept_whole() {
    let profiles = "Symbol,FechaFundada\nMMM,19020101\nAOS,\n";
    let (dir, config) = workspace(profiles, COMPANIES_CSV);
    let loader = connect(dir.path()).await;

    loader.load(&LoadTarget::from_config(&config)).await.unwrap();

    let years: Vec<Option<String>> =
        sqlx::query_scalar("SELECT FechaFundada FROM CompanyProfiles ORDER BY rowid")
            .fetch_all(loader.pool())
            .await
            .unwrap();
    assert_eq!(years, vec![Some("19020101".to_string()), None]);

    loader.close().await;
}

#[tokio::test]
async fn repeated_csv_headers_become_separate_columns() {
    let profiles = "Symbol,Name,Name,FechaFundada\nMMM,3M,Minnesota Mining,1902\n";
    let (dir, config) = workspace(profiles, COMPANIES_CSV);
    let loader = connect(dir.path()).await;

    let summary = loader.load(&LoadTarget::from_config(&config)).await.unwrap();
    assert_eq!(summary.tables[0].rows_appended, 1);

    let (first, second): (String, String) =
        sqlx::query_as("SELECT \"Name\", \"Name.1\" FROM CompanyProfiles")
            .fetch_one(loader.pool())
            .await
            .unwrap();
    assert_eq!(first, "3M");
    assert_eq!(second, "Minnesota Mining");

    loader.close().await;
}

#[tokio::test]
async fn missing_csv_file_fails_the_load() {
    let dir = tempdir().unwrap();
    let config = Config::new().with_output_dir(dir.path().to_str().unwrap());
    let loader = connect(dir.path()).await;

    let err = loader.load(&LoadTarget::from_config(&config)).await.unwrap_err();
    assert!(matches!(err, EtlError::CsvError(_)));

    loader.close().await;
}
