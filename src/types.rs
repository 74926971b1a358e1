use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the scraped table. `mc_usd_billion` is `None` when the cell
/// could not be read as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MC_USD_Billion")]
    pub mc_usd_billion: Option<f64>,
}

/// A bank row with its market cap converted into the target currencies.
///
/// Field order is the column order of both sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedBankRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MC_USD_Billion")]
    pub mc_usd_billion: Option<f64>,
    #[serde(rename = "MC_GBP_Billion")]
    pub mc_gbp_billion: Option<f64>,
    #[serde(rename = "MC_EUR_Billion")]
    pub mc_eur_billion: Option<f64>,
    #[serde(rename = "MC_INR_Billion")]
    pub mc_inr_billion: Option<f64>,
}

/// Column names shared by the CSV header and the database table.
pub const COLUMNS: [&str; 5] = [
    "Name",
    "MC_USD_Billion",
    "MC_GBP_Billion",
    "MC_EUR_Billion",
    "MC_INR_Billion",
];

/// Output of the extract stage, in page order.
pub type ExtractedDataset = Vec<BankRecord>;

/// Output of the transform stage, in extraction order.
pub type Dataset = Vec<EnrichedBankRecord>;

/// Currencies every rate table has to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Currency {
    Eur,
    Gbp,
    Inr,
}

impl Currency {
    pub const REQUIRED: [Currency; 3] = [Currency::Eur, Currency::Gbp, Currency::Inr];

    pub fn code(self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Pipeline stages, used to report where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Transformation,
    CsvLoad,
    DatabaseLoad,
    Reporting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "Extraction",
            Stage::Transformation => "Transformation",
            Stage::CsvLoad => "CSV Load",
            Stage::DatabaseLoad => "Database Load",
            Stage::Reporting => "Reporting",
        };
        f.write_str(name)
    }
}
