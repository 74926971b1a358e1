use crate::config::Config;
use crate::extract::extract;
use crate::http::PageSource;
use crate::load::{load_to_csv, load_to_db};
use crate::logging::{verify_logs, LogHandle};
use crate::report::{run_queries, QueryResults};
use crate::transform::{transform, RateTable};
use crate::types::{Dataset, ExtractedDataset, Stage};
use metrics::{counter, histogram};
use std::time::Instant;
use tracing::{error, info, instrument};

/// What a complete run did.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    /// Extraction or transformation failure; nothing downstream ran.
    pub failed_stage: Option<Stage>,
    pub rows: usize,
    pub csv_loaded: bool,
    pub db_loaded: bool,
    pub reports: Option<QueryResults>,
    pub logs_verified: bool,
}

impl PipelineOutcome {
    /// Stages that did not complete, in pipeline order.
    pub fn failures(&self) -> Vec<Stage> {
        if let Some(stage) = self.failed_stage {
            return vec![stage];
        }
        let mut failed = Vec::new();
        if !self.csv_loaded {
            failed.push(Stage::CsvLoad);
        }
        if !self.db_loaded {
            failed.push(Stage::DatabaseLoad);
        }
        if self.reports.is_none() {
            failed.push(Stage::Reporting);
        }
        failed
    }

    pub fn is_success(&self) -> bool {
        self.failures().is_empty()
    }
}

fn record_duration(stage: Stage, started: Instant) {
    histogram!("banks_etl_stage_duration_seconds", "stage" => stage.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub struct Pipeline;

impl Pipeline {
    async fn extract_stage(config: &Config, source: &dyn PageSource) -> Option<ExtractedDataset> {
        let started = Instant::now();
        let result = extract(&config.source, source).await;
        record_duration(Stage::Extraction, started);
        match result {
            Ok(records) => Some(records),
            Err(e) => {
                error!("Error in data extraction: {}", e);
                None
            }
        }
    }

    fn transform_stage(config: &Config, records: &ExtractedDataset) -> Option<Dataset> {
        info!("Starting data transformation");
        let started = Instant::now();
        info!("Reading exchange rates from {}", config.rates.path.display());
        let result = RateTable::load(&config.rates.path).map(|rates| transform(records, &rates));
        record_duration(Stage::Transformation, started);

        match result {
            Ok(dataset) => {
                info!("Data transformation completed successfully");
                Some(dataset)
            }
            Err(e) => {
                error!("Error in data transformation: {}", e);
                None
            }
        }
    }

    fn csv_stage(config: &Config, dataset: &Dataset) -> bool {
        let started = Instant::now();
        let result = load_to_csv(dataset, &config.output.csv_path);
        record_duration(Stage::CsvLoad, started);
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Error saving to CSV: {}", e);
                false
            }
        }
    }

    fn db_stage(config: &Config, dataset: &Dataset) -> bool {
        let started = Instant::now();
        let result = load_to_db(dataset, &config.output.db_path, &config.output.table_name);
        record_duration(Stage::DatabaseLoad, started);
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Error in database loading: {}", e);
                false
            }
        }
    }

    fn report_stage(config: &Config) -> Option<QueryResults> {
        let started = Instant::now();
        let result = run_queries(&config.output.db_path, &config.output.table_name);
        record_duration(Stage::Reporting, started);
        match result {
            Ok(results) => {
                results.print();
                Some(results)
            }
            Err(e) => {
                error!("Error in database queries: {}", e);
                None
            }
        }
    }

    /// Runs extract, transform, both loads, the reports and the log check in order.
    ///
    /// A failed extraction or transformation stops the run before anything is
    /// written. The reports only run after a successful database load; the log
    /// check runs once loading was attempted, whatever its result.
    #[instrument(skip_all)]
    pub async fn run(config: &Config, source: &dyn PageSource, log: &LogHandle) -> PipelineOutcome {
        info!("ETL Process Started");
        counter!("banks_etl_runs_total").increment(1);
        let mut outcome = PipelineOutcome::default();

        let Some(extracted) = Self::extract_stage(config, source).await else {
            error!("ETL Process Failed at Extraction Stage");
            outcome.failed_stage = Some(Stage::Extraction);
            return outcome;
        };

        let Some(dataset) = Self::transform_stage(config, &extracted) else {
            error!("ETL Process Failed at Transformation Stage");
            outcome.failed_stage = Some(Stage::Transformation);
            return outcome;
        };
        outcome.rows = dataset.len();

        outcome.csv_loaded = Self::csv_stage(config, &dataset);
        outcome.db_loaded = Self::db_stage(config, &dataset);
        if outcome.db_loaded {
            outcome.reports = Self::report_stage(config);
        }

        outcome.logs_verified = verify_logs(log);

        if outcome.is_success() {
            info!("ETL Process Completed Successfully");
        } else {
            let failed: Vec<String> = outcome.failures().iter().map(|s| s.to_string()).collect();
            error!("ETL Process Completed with failures: {}", failed.join(", "));
        }
        counter!("banks_etl_rows_loaded_total").increment(outcome.rows as u64);
        outcome
    }
}
