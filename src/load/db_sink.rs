use crate::db::{close_store, open_store};
use crate::error::Result;
use crate::types::{EnrichedBankRecord, COLUMNS};
use rusqlite::params;
use std::path::Path;
use tracing::{debug, info};

/// Replaces `table` in the store at `db_path` with `records`.
///
/// Drop, create and inserts run in one transaction, so loading the same data
/// twice leaves exactly one copy.
pub fn load_to_db(records: &[EnrichedBankRecord], db_path: &Path, table: &str) -> Result<()> {
    info!("Starting database loading process");
    let mut conn = open_store(db_path)?;

    let tx = conn.transaction()?;
    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table};
         CREATE TABLE {table} (
             Name           TEXT,
             MC_USD_Billion REAL,
             MC_GBP_Billion REAL,
             MC_EUR_Billion REAL,
             MC_INR_Billion REAL
         );"
    ))?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
            COLUMNS.join(", ")
        ))?;
        for record in records {
            stmt.execute(params![
                record.name,
                record.mc_usd_billion,
                record.mc_gbp_billion,
                record.mc_eur_billion,
                record.mc_inr_billion,
            ])?;
        }
    }
    tx.commit()?;
    debug!("Inserted {} rows into {}", records.len(), table);

    close_store(conn)?;
    info!("Data successfully loaded to {}", db_path.display());
    Ok(())
}
