mod common;

use chrono::NaiveDate;
use common::{constituent_table, FakeConstituents, FakePrices};
use sp500_etl::config::Config;
use sp500_etl::logging;
use sp500_etl::services::etl_service::EtlService;
use std::sync::Arc;
use tempfile::tempdir;

// 日志器是全局的，本文件只放一个测试
#[tokio::test]
async fn run_events_are_appended_to_log_file() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("etl_process.log");
    std::fs::write(&log_path, "previous run\n").unwrap();

    logging::init(Some(&log_path)).unwrap();

    let table = constituent_table(&[
        [Some("AAA"), Some("X Corp"), Some("Tech"), Some("Software")],
        [Some("ZZZ"), Some("Z Corp"), Some("Energy"), Some("Oil")],
    ]);
    let service = EtlService::new(
        Config::new().with_output_dir(dir.path().to_str().unwrap()),
        Arc::new(FakeConstituents::with_table(table)),
        Arc::new(FakePrices::new().with_closes("AAA", &[10.0])),
    );
    service.run(&NaiveDate::from_ymd_opt(2024, 5, 30).unwrap()).await.unwrap();
    log::logger().flush();

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();

    assert_eq!(lines[0], "previous run");
    let skips: Vec<&&str> = lines
        .iter()
        .filter(|l| l.contains(":ERROR:Error extracting price data for ZZZ"))
        .collect();
    assert_eq!(skips.len(), 1);
    assert!(lines.iter().any(|l| l.contains(":INFO:Price data for AAA extracted")));
    assert!(lines.last().unwrap().ends_with(":INFO:ETL process completed successfully"));
}
