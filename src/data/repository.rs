use rusqlite::{params, Connection, Row};

use crate::data::SEARCH_MATCHES_FN;
use crate::error::AppError;
use crate::models::document::{DocumentRecord, NewDocument};
use crate::models::search::SearchMode;

const DOCUMENT_COLUMNS: &str =
    "id, name, mimeType, sizeInBytes, path, lastModifiedTimeStamp, owner, author";

fn document_from_row(row: &Row<'_>) -> Result<DocumentRecord, rusqlite::Error> {
    Ok(DocumentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        mime_type: row.get(2)?,
        size_in_bytes: row.get(3)?,
        path: row.get(4)?,
        last_modified_time_stamp: row.get(5)?,
        owner: row.get(6)?,
        author: row.get(7)?,
    })
}

pub fn insert_document(conn: &Connection, doc: &NewDocument) -> Result<i64, AppError> {
    conn.execute(
        "INSERT INTO files (name, mimeType, sizeInBytes, path, lastModifiedTimeStamp, owner, author)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doc.name,
            doc.mime_type,
            doc.size_in_bytes,
            doc.path,
            doc.last_modified_time_stamp,
            doc.owner,
            doc.author,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_document(conn: &Connection, id: i64) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM files WHERE id = ?1", params![id])?;
    Ok(count)
}

pub fn get_document(conn: &Connection, id: i64) -> Result<Option<DocumentRecord>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM files WHERE id = ?1"
    ))?;

    let record = stmt
        .query_row(params![id], document_from_row)
        .optional()?;

    Ok(record)
}

pub fn list_documents(conn: &Connection) -> Result<Vec<DocumentRecord>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM files ORDER BY id ASC"
    ))?;

    let records = stmt
        .query_map([], document_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Filters by name with the same predicate the content search applies to
/// lines. Requires [`crate::data::register_search_functions`] on `conn`.
pub fn find_documents_by_name(
    conn: &Connection,
    query: &str,
    mode: SearchMode,
) -> Result<Vec<DocumentRecord>, AppError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM files
         WHERE {SEARCH_MATCHES_FN}(?1, name, ?2)
         ORDER BY id ASC"
    ))?;

    let records = stmt
        .query_map(params![mode.to_string(), query], document_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

// Needed for rusqlite optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
