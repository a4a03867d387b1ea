use tracing::info;

use crate::data::repository;
use crate::error::AppError;
use crate::models::document::DocumentRecord;
use crate::models::search::SearchMode;
use crate::services::import_service;
use crate::state::AppState;

pub fn list_documents(state: &AppState) -> Result<Vec<DocumentRecord>, AppError> {
    let conn = state.conn();
    repository::list_documents(&conn)
}

/// A blank query lists everything.
pub fn search_documents(
    query: String,
    mode: Option<SearchMode>,
    state: &AppState,
) -> Result<Vec<DocumentRecord>, AppError> {
    let conn = state.conn();
    if query.trim().is_empty() {
        return repository::list_documents(&conn);
    }
    repository::find_documents_by_name(&conn, &query, mode.unwrap_or_default())
}

pub fn get_document(id: i64, state: &AppState) -> Result<DocumentRecord, AppError> {
    let conn = state.conn();
    repository::get_document(&conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("document {id}")))
}

pub fn import_document(locator: String, state: &AppState) -> Result<DocumentRecord, AppError> {
    // File work happens before the connection is locked.
    let doc = import_service::prepare_document(&locator, state.provider.as_ref(), &state.config)?;
    let conn = state.conn();
    import_service::store_document(&conn, doc)
}

/// Returns whether a row was removed.
pub fn delete_document(id: i64, state: &AppState) -> Result<bool, AppError> {
    let conn = state.conn();
    let removed = repository::delete_document(&conn, id)? > 0;
    info!(document_id = id, removed, "document deleted");
    Ok(removed)
}
