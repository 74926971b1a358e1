use crate::error::{EtlError, Result};
use crate::types::{BankRecord, Currency, Dataset, EnrichedBankRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct RateRow {
    #[serde(rename = "Currency")]
    currency: String,
    #[serde(rename = "Rate")]
    rate: f64,
}

/// Conversion rates from USD, keyed by currency code.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    /// Builds a table from `(code, rate)` pairs, checking the required currencies.
    ///
    /// Later duplicates of a code replace earlier ones.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let rates: HashMap<String, f64> = pairs
            .into_iter()
            .map(|(code, rate)| {
                let code: String = code.into();
                (code.trim().to_string(), rate)
            })
            .collect();

        let missing: Vec<String> = Currency::REQUIRED
            .iter()
            .filter(|c| !rates.contains_key(c.code()))
            .map(|c| c.code().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::MissingRates(missing));
        }

        for currency in Currency::REQUIRED {
            let rate = rates[currency.code()];
            if !(rate.is_finite() && rate > 0.0) {
                return Err(EtlError::InvalidRate {
                    currency: currency.code().to_string(),
                    rate,
                });
            }
        }
        Ok(Self { rates })
    }

    /// Reads a CSV file with at least `Currency` and `Rate` columns.
    pub fn load(path: &Path) -> Result<Self> {
        let rate_file_error = |message: String| EtlError::RateFile {
            path: path.display().to_string(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| rate_file_error(e.to_string()))?;

        let mut pairs = Vec::new();
        for row in reader.deserialize::<RateRow>() {
            let row = row.map_err(|e| rate_file_error(e.to_string()))?;
            debug!("Read rate {} = {}", row.currency, row.rate);
            pairs.push((row.currency, row.rate));
        }
        Self::from_pairs(pairs)
    }

    pub fn rate(&self, currency: Currency) -> f64 {
        // Presence of every required code is checked on construction.
        self.rates[currency.code()]
    }
}

/// Rounds half away from zero to two decimals, like SQLite's `ROUND(x, 2)`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn convert(usd: Option<f64>, rate: f64) -> Option<f64> {
    usd.map(|v| round2(v * rate))
}

/// Adds the GBP, EUR and INR market caps to every record, keeping row order.
pub fn transform(records: &[BankRecord], rates: &RateTable) -> Dataset {
    info!(
        "Converting {} records with EUR={}, GBP={}, INR={}",
        records.len(),
        rates.rate(Currency::Eur),
        rates.rate(Currency::Gbp),
        rates.rate(Currency::Inr)
    );

    records
        .iter()
        .map(|record| EnrichedBankRecord {
            name: record.name.clone(),
            mc_usd_billion: record.mc_usd_billion,
            mc_gbp_billion: convert(record.mc_usd_billion, rates.rate(Currency::Gbp)),
            mc_eur_billion: convert(record.mc_usd_billion, rates.rate(Currency::Eur)),
            mc_inr_billion: convert(record.mc_usd_billion, rates.rate(Currency::Inr)),
        })
        .collect()
}
