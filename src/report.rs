use crate::db::{close_store, open_store};
use crate::error::{EtlError, Result};
use comfy_table::{presets, CellAlignment, Table};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::fmt;
use std::path::Path;
use tracing::info;

pub const MARKET_CAP_ANALYSIS: &str = "Market Cap Analysis";
pub const AVERAGE_BY_CURRENCY: &str = "Average by Currency";
pub const BANK_SIZE_COMPARISON: &str = "Bank Size Comparison";

fn queries(table: &str) -> [(&'static str, String); 3] {
    [
        (
            MARKET_CAP_ANALYSIS,
            format!(
                "SELECT
                    ROUND(AVG(MC_EUR_Billion), 2) AS Average_MC_EUR,
                    ROUND(MAX(MC_EUR_Billion), 2) AS Max_MC_EUR,
                    ROUND(MIN(MC_EUR_Billion), 2) AS Min_MC_EUR,
                    ROUND(MAX(MC_EUR_Billion) / MIN(MC_EUR_Billion), 2) AS Max_to_Min_Ratio
                 FROM {table}"
            ),
        ),
        (
            AVERAGE_BY_CURRENCY,
            format!(
                "SELECT
                    ROUND(AVG(MC_EUR_Billion), 2) AS Avg_EUR,
                    ROUND(AVG(MC_USD_Billion), 2) AS Avg_USD,
                    ROUND(AVG(MC_GBP_Billion), 2) AS Avg_GBP,
                    ROUND(AVG(MC_INR_Billion), 2) AS Avg_INR
                 FROM {table}"
            ),
        ),
        (
            BANK_SIZE_COMPARISON,
            format!(
                "WITH max_cap AS (
                    SELECT MAX(MC_EUR_Billion) AS max_mc FROM {table}
                 )
                 SELECT
                    Name,
                    MC_EUR_Billion,
                    ROUND(MC_EUR_Billion / max_mc * 100, 2) AS Percent_of_Largest
                 FROM {table}, max_cap
                 ORDER BY MC_EUR_Billion DESC"
            ),
        ),
    ]
}

/// Result set of one labelled query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTable {
    pub label: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Numeric value of `column` in row `row`; integers are widened.
    pub fn real(&self, row: usize, column: &str) -> Option<f64> {
        match self.value(row, column)? {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => format!("{:.2}", v),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING).set_header(&self.columns);
        for row in &self.rows {
            table.add_row(row.iter().map(render_value));
        }
        for column in table.column_iter_mut() {
            column.set_cell_alignment(CellAlignment::Right);
        }
        writeln!(f, "{}", table)
    }
}

/// The three report tables, in the order they were run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResults {
    tables: Vec<QueryTable>,
}

impl QueryResults {
    pub fn get(&self, label: &str) -> Option<&QueryTable> {
        self.tables.iter().find(|t| t.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueryTable> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Prints every table under its label.
    pub fn print(&self) {
        for table in &self.tables {
            println!("\n{}:", table.label);
            print!("{}", table);
        }
    }
}

fn run_query(conn: &Connection, label: &str, sql: &str) -> Result<QueryTable> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<Value>>>()
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(QueryTable {
        label: label.to_string(),
        columns,
        rows,
    })
}

/// Runs the aggregate reports against `table`. Any failing query fails the
/// whole report; no partial results are returned.
pub fn run_queries(db_path: &Path, table: &str) -> Result<QueryResults> {
    info!("Starting database queries");
    if !db_path.exists() {
        return Err(EtlError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("database {} does not exist", db_path.display()),
        )));
    }
    let conn = open_store(db_path)?;

    let mut tables = Vec::with_capacity(3);
    for (label, sql) in queries(table) {
        tables.push(run_query(&conn, label, &sql)?);
    }
    close_store(conn)?;

    info!("Database queries completed successfully");
    Ok(QueryResults { tables })
}
