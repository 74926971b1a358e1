use crate::error::Result;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Opens the file-backed store, creating its directory if needed.
pub fn open_store(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(Connection::open(db_path)?)
}

/// Closes `conn`, surfacing errors that a plain drop would swallow.
pub fn close_store(conn: Connection) -> Result<()> {
    conn.close().map_err(|(_, e)| e)?;
    Ok(())
}
