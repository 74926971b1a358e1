use anyhow::Context;
use banks_etl::config::Config;
use banks_etl::http::ReqwestPageSource;
use banks_etl::logging;
use banks_etl::pipeline::Pipeline;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "banks_etl")]
#[command(about = "Extracts the largest banks by market cap, converts and loads them")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./banks_etl.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;
    let log = logging::init_logging(&config.logging).context("initializing logging")?;
    let source = ReqwestPageSource::new(&config.source).context("building HTTP client")?;

    let outcome = Pipeline::run(&config, &source, &log).await;

    if outcome.is_success() {
        println!("\n✅ ETL run finished: {} banks loaded", outcome.rows);
        Ok(ExitCode::SUCCESS)
    } else {
        let failed: Vec<String> = outcome.failures().iter().map(|s| s.to_string()).collect();
        println!("\n❌ ETL run failed at: {}", failed.join(", "));
        Ok(ExitCode::FAILURE)
    }
}
