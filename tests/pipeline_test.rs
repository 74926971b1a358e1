use async_trait::async_trait;
use banks_etl::config::Config;
use banks_etl::http::PageSource;
use banks_etl::load::read_csv;
use banks_etl::logging::LogHandle;
use banks_etl::pipeline::Pipeline;
use banks_etl::report::{BANK_SIZE_COMPARISON, MARKET_CAP_ANALYSIS};
use banks_etl::types::Stage;
use banks_etl::{EtlError, Result};
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const PAGE: &str = include_str!("fixtures/largest_banks.html");

struct FixturePage(&'static str);

#[async_trait]
impl PageSource for FixturePage {
    async fn fetch(&self, _url: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct Offline;

#[async_trait]
impl PageSource for Offline {
    async fn fetch(&self, url: &str) -> Result<String> {
        Err(EtlError::Io(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            format!("offline: {}", url),
        )))
    }
}

fn workspace() -> (TempDir, Config, LogHandle) {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(
        root.join("exchange_rate.csv"),
        "Currency,Rate\nEUR,0.93\nGBP,0.8\nINR,82.95\n",
    )
    .unwrap();
    fs::write(root.join("code_log.txt"), "2024-01-01 00:00:00,000 - INFO - ETL Process Started\n")
        .unwrap();

    let mut config = Config::default();
    config.source.url = "http://fixture.invalid/List_of_largest_banks".to_string();
    config.rates.path = root.join("exchange_rate.csv");
    config.output.csv_path = root.join("Largest_banks_data.csv");
    config.output.db_path = root.join("Banks.db");
    config.logging.file = root.join("code_log.txt");

    let log = LogHandle::new(config.logging.file.clone());
    (dir, config, log)
}

fn row_count(db_path: &Path) -> i64 {
    let conn = Connection::open(db_path).unwrap();
    conn.query_row("SELECT COUNT(*) FROM Largest_banks", [], |row| row.get(0))
        .unwrap()
}

#[tokio::test]
async fn full_run_loads_both_sinks_and_reports() {
    let (_dir, config, log) = workspace();

    let outcome = Pipeline::run(&config, &FixturePage(PAGE), &log).await;

    assert!(outcome.is_success(), "failures: {:?}", outcome.failures());
    assert_eq!(outcome.rows, 10);
    assert!(outcome.csv_loaded);
    assert!(outcome.db_loaded);
    assert!(outcome.logs_verified);

    let rows = read_csv(&config.output.csv_path).unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0].name, "JPMorgan Chase");
    assert_eq!(rows[0].mc_usd_billion, Some(432.92));
    assert_eq!(rows[0].mc_eur_billion, Some(402.62));
    assert_eq!(rows[0].mc_gbp_billion, Some(346.34));
    assert_eq!(rows[0].mc_inr_billion, Some(35910.71));
    assert_eq!(rows[4].name, "HDFC Bank");

    assert_eq!(row_count(&config.output.db_path), 10);

    let reports = outcome.reports.unwrap();
    assert_eq!(reports.len(), 3);
    let q1 = reports.get(MARKET_CAP_ANALYSIS).unwrap();
    assert_eq!(q1.real(0, "Max_MC_EUR"), Some(402.62));
    let q3 = reports.get(BANK_SIZE_COMPARISON).unwrap();
    assert_eq!(q3.rows.len(), 10);
    assert_eq!(q3.real(0, "Percent_of_Largest"), Some(100.0));
}

#[tokio::test]
async fn running_twice_keeps_one_copy_of_the_data() {
    let (_dir, config, log) = workspace();

    Pipeline::run(&config, &FixturePage(PAGE), &log).await;
    let outcome = Pipeline::run(&config, &FixturePage(PAGE), &log).await;

    assert!(outcome.db_loaded);
    assert_eq!(row_count(&config.output.db_path), 10);
}

#[tokio::test]
async fn missing_rate_file_stops_before_any_load() {
    let (_dir, mut config, log) = workspace();
    config.rates.path = config.rates.path.with_file_name("absent.csv");

    let outcome = Pipeline::run(&config, &FixturePage(PAGE), &log).await;

    assert_eq!(outcome.failed_stage, Some(Stage::Transformation));
    assert_eq!(outcome.failures(), vec![Stage::Transformation]);
    assert!(!outcome.csv_loaded);
    assert!(!outcome.db_loaded);
    assert!(outcome.reports.is_none());
    assert!(!config.output.csv_path.exists());
    assert!(!config.output.db_path.exists());
}

#[tokio::test]
async fn rate_file_without_inr_fails_transformation() {
    let (_dir, config, log) = workspace();
    fs::write(&config.rates.path, "Currency,Rate\nEUR,0.93\nGBP,0.8\n").unwrap();

    let outcome = Pipeline::run(&config, &FixturePage(PAGE), &log).await;

    assert_eq!(outcome.failed_stage, Some(Stage::Transformation));
    assert!(!config.output.db_path.exists());
}

#[tokio::test]
async fn page_without_market_cap_table_fails_extraction() {
    let (_dir, config, log) = workspace();
    let page = r#"<table class="wikitable"><tr><th>Bank name</th><th>Total assets</th></tr></table>"#;

    let outcome = Pipeline::run(&config, &FixturePage(page), &log).await;

    assert_eq!(outcome.failed_stage, Some(Stage::Extraction));
    assert!(!outcome.is_success());
    assert!(!config.output.csv_path.exists());
}

#[tokio::test]
async fn fetch_failure_fails_extraction() {
    let (_dir, config, log) = workspace();

    let outcome = Pipeline::run(&config, &Offline, &log).await;

    assert_eq!(outcome.failed_stage, Some(Stage::Extraction));
    assert!(!outcome.logs_verified);
}

#[tokio::test]
async fn database_failure_skips_reports_but_keeps_csv() {
    let (dir, mut config, log) = workspace();
    // a directory cannot be opened as a database file
    let blocked = dir.path().join("blocked.db");
    fs::create_dir(&blocked).unwrap();
    config.output.db_path = blocked;

    let outcome = Pipeline::run(&config, &FixturePage(PAGE), &log).await;

    assert_eq!(outcome.failed_stage, None);
    assert!(outcome.csv_loaded);
    assert!(!outcome.db_loaded);
    assert!(outcome.reports.is_none());
    assert!(outcome.logs_verified);
    assert_eq!(
        outcome.failures(),
        vec![Stage::DatabaseLoad, Stage::Reporting]
    );
}

#[tokio::test]
async fn table_without_data_rows_still_writes_csv_header() {
    let (_dir, config, log) = workspace();
    let page = r#"<html><body><table class="wikitable">
        <tr><th>Bank name</th><th>Market cap (US$ billion)</th></tr>
        </table></body></html>"#;

    let outcome = Pipeline::run(&config, &FixturePage(page), &log).await;

    assert_eq!(outcome.rows, 0);
    assert!(outcome.csv_loaded);
    assert!(outcome.db_loaded);
    let text = fs::read_to_string(&config.output.csv_path).unwrap();
    assert_eq!(
        text.lines().next(),
        Some("Name,MC_USD_Billion,MC_GBP_Billion,MC_EUR_Billion,MC_INR_Billion")
    );
    assert!(read_csv(&config.output.csv_path).unwrap().is_empty());
    assert_eq!(row_count(&config.output.db_path), 0);
}
