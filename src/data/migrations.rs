use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    mimeType TEXT NOT NULL,
    sizeInBytes INTEGER NOT NULL,
    path TEXT NOT NULL,
    lastModifiedTimeStamp INTEGER NOT NULL,
    owner TEXT NOT NULL,
    author TEXT NOT NULL
);
";

pub fn run_migrations(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch(SCHEMA_V1)?;
    Ok(())
}
