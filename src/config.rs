use crate::error::{EtlError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "banks_etl.toml";

pub const SOURCE_URL_ENV: &str = "BANKS_ETL_SOURCE_URL";
pub const RATES_PATH_ENV: &str = "BANKS_ETL_RATES_PATH";
pub const CSV_PATH_ENV: &str = "BANKS_ETL_CSV_PATH";
pub const DB_PATH_ENV: &str = "BANKS_ETL_DB_PATH";
pub const LOG_FILE_ENV: &str = "BANKS_ETL_LOG_FILE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub rates: RatesConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Where the bank table is scraped from and how it is recognised.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub table_class: String,
    pub header_marker: String,
    pub name_column: String,
    pub value_column: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "https://web.archive.org/web/20230908091635/https://en.wikipedia.org/wiki/List_of_largest_banks".to_string(),
            table_class: "wikitable".to_string(),
            header_marker: "Market cap".to_string(),
            name_column: "Bank name".to_string(),
            value_column: "Market cap (US$ billion)".to_string(),
            timeout_seconds: 30,
            user_agent: concat!("banks_etl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub path: PathBuf,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("exchange_rate.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub table_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("./Largest_banks_data.csv"),
            db_path: PathBuf::from("Banks.db"),
            table_name: "Largest_banks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("code_log.txt"),
        }
    }
}

impl Config {
    /// Loads the configuration, then applies `BANKS_ETL_*` environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `banks_etl.toml` is read if present and
    /// the built-in defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(SOURCE_URL_ENV) {
            self.source.url = url;
        }
        if let Some(path) = lookup(RATES_PATH_ENV) {
            self.rates.path = PathBuf::from(path);
        }
        if let Some(path) = lookup(CSV_PATH_ENV) {
            self.output.csv_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            self.output.db_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(LOG_FILE_ENV) {
            self.logging.file = PathBuf::from(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !is_sql_identifier(&self.output.table_name) {
            return Err(EtlError::Config(format!(
                "table name '{}' is not a plain SQL identifier",
                self.output.table_name
            )));
        }
        if self.source.timeout_seconds == 0 {
            return Err(EtlError::Config(
                "source.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.source.name_column.trim().is_empty() || self.source.value_column.trim().is_empty()
        {
            return Err(EtlError::Config(
                "source column names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// The table name is interpolated into DDL, so only bare identifiers are accepted.
static SQL_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

fn is_sql_identifier(name: &str) -> bool {
    SQL_IDENTIFIER.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_fixed_job_layout() {
        let config = Config::default();
        assert_eq!(config.rates.path, PathBuf::from("exchange_rate.csv"));
        assert_eq!(config.output.db_path, PathBuf::from("Banks.db"));
        assert_eq!(config.output.table_name, "Largest_banks");
        assert_eq!(config.logging.file, PathBuf::from("code_log.txt"));
        assert_eq!(config.source.header_marker, "Market cap");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = Config::from_toml(
            r#"
            [output]
            db_path = "out/banks.db"

            [source]
            timeout_seconds = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.output.db_path, PathBuf::from("out/banks.db"));
        assert_eq!(config.output.table_name, "Largest_banks");
        assert_eq!(config.source.timeout_seconds, 5);
        assert_eq!(config.source.name_column, "Bank name");
    }

    #[test]
    fn environment_overrides_win_over_file_values() {
        let vars: HashMap<&str, &str> = [
            (SOURCE_URL_ENV, "http://localhost/banks"),
            (DB_PATH_ENV, "/tmp/other.db"),
            (CSV_PATH_ENV, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.source.url, "http://localhost/banks");
        assert_eq!(config.output.db_path, PathBuf::from("/tmp/other.db"));
        // blank values are ignored
        assert_eq!(
            config.output.csv_path,
            PathBuf::from("./Largest_banks_data.csv")
        );
    }

    #[test]
    fn rejects_table_names_that_are_not_identifiers() {
        let mut config = Config::default();
        config.output.table_name = "banks; DROP TABLE x".to_string();
        assert!(matches!(config.validate(), Err(EtlError::Config(_))));

        config.output.table_name = "1banks".to_string();
        assert!(config.validate().is_err());

        config.output.table_name = "_banks_2023".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(EtlError::Config(_))));
    }
}
