use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Target table not found")]
    TableNotFound,

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("Failed to read exchange rates from {path}: {message}")]
    RateFile { path: String, message: String },

    #[error("Missing exchange rates for currencies: {{{}}}", .0.join(", "))]
    MissingRates(Vec<String>),

    #[error("Invalid exchange rate for {currency}: {rate}")]
    InvalidRate { currency: String, rate: f64 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;
