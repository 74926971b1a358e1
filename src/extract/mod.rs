pub mod numeric;
pub mod table;

pub use numeric::parse_market_cap;
pub use table::{find_table, HeaderMarkerMatcher, HtmlTable, TableMatcher};

use crate::config::SourceConfig;
use crate::error::{EtlError, Result};
use crate::http::PageSource;
use crate::types::{BankRecord, ExtractedDataset};
use metrics::counter;
use scraper::Html;
use tracing::{info, instrument, warn};

/// Fetches the configured page and extracts the bank table from it.
#[instrument(skip_all, fields(url = %config.url))]
pub async fn extract(config: &SourceConfig, source: &dyn PageSource) -> Result<ExtractedDataset> {
    info!("Starting data extraction from {}", config.url);
    info!("Making HTTP request to {}", config.url);
    let html = source.fetch(&config.url).await?;

    let matcher = HeaderMarkerMatcher::from_config(config);
    extract_from_html(&html, &matcher, config)
}

/// Extracts `(name, market cap)` rows from an already fetched page.
pub fn extract_from_html(
    html: &str,
    matcher: &dyn TableMatcher,
    config: &SourceConfig,
) -> Result<ExtractedDataset> {
    let document = Html::parse_document(html);

    info!("Locating {}", matcher.describe());
    let Some(element) = find_table(&document, matcher) else {
        warn!("Target table not found: no {}", matcher.describe());
        return Err(EtlError::TableNotFound);
    };
    info!("Target table found - processing data");

    let table = HtmlTable::from_element(element)?;
    info!("Available columns: {:?}", table.headers());

    let name_idx = table
        .column_index(&config.name_column)
        .ok_or_else(|| EtlError::MissingColumn(config.name_column.clone()))?;
    let value_idx = table
        .column_index(&config.value_column)
        .ok_or_else(|| EtlError::MissingColumn(config.value_column.clone()))?;

    let mut missing = 0u64;
    let records: ExtractedDataset = table
        .rows()
        .iter()
        .map(|row| {
            let name = row.get(name_idx).cloned().unwrap_or_default();
            let raw_value = row.get(value_idx).map(String::as_str).unwrap_or("");
            let mc_usd_billion = parse_market_cap(raw_value);
            if mc_usd_billion.is_none() {
                missing += 1;
                warn!("Could not read market cap '{}' for '{}'", raw_value, name);
            }
            BankRecord {
                name,
                mc_usd_billion,
            }
        })
        .collect();

    counter!("banks_etl_rows_extracted_total").increment(records.len() as u64);
    counter!("banks_etl_market_cap_missing_total").increment(missing);
    info!(
        "Data extraction completed successfully ({} rows, {} without a market cap)",
        records.len(),
        missing
    );
    Ok(records)
}
