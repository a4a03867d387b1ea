use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::data::repository;
use crate::error::AppError;
use crate::models::search::{MatchResult, SearchMode};
use crate::services::format_reader::FILE_NOT_FOUND;
use crate::services::locator_service::{self, LocatorKind, BLANK_LOCATOR};
use crate::session::PreviewSession;
use crate::state::AppState;

/// Opens a document for preview. Locator and decode failures end up as the
/// session's content; only a missing record or a failed task is an error.
/// A locator failure leaves the session with nothing to search.
pub async fn open_preview(state: Arc<AppState>, id: i64) -> Result<Arc<PreviewSession>, AppError> {
    let document = repository::get_document(&state.conn(), id)?
        .ok_or_else(|| AppError::NotFound(format!("document {id}")))?;
    let context_chars = state.reader.limits().match_context_chars;

    match LocatorKind::classify(&document.path) {
        LocatorKind::Blank => {
            warn!(document_id = id, name = %document.name, "document has no path");
            return Ok(Arc::new(PreviewSession::unavailable(
                document,
                BLANK_LOCATOR,
                context_chars,
            )));
        }
        LocatorKind::Unknown => {
            warn!(document_id = id, path = %document.path, "unknown path format");
            let message = format!("unknown path format: {}", document.path);
            return Ok(Arc::new(PreviewSession::unavailable(document, message, context_chars)));
        }
        LocatorKind::Direct | LocatorKind::Remote => {}
    }

    let session = tokio::task::spawn_blocking(move || {
        let local = match locator_service::resolve_locator(
            &document.path,
            state.provider.as_ref(),
            &state.config.cache_dir,
        ) {
            Ok(local) => local,
            Err(err) => {
                warn!(document_id = id, path = %document.path, error = %err, "could not resolve document");
                return PreviewSession::unavailable(document, err.to_string(), context_chars);
            }
        };
        if !local.path().exists() {
            warn!(document_id = id, path = %document.path, "document file is missing");
            return PreviewSession::unavailable(document, FILE_NOT_FOUND, context_chars);
        }
        let content = state.reader.read(local.path());
        PreviewSession::new(document, content, context_chars, Some(local))
    })
    .await
    .map_err(|e| AppError::General(format!("preview task failed: {e}")))?;

    info!(
        document_id = id,
        session_id = %session.id(),
        truncated = session.content().is_truncated,
        "preview opened"
    );
    Ok(Arc::new(session))
}

/// Runs one search over the session's text off the async threads. Returns
/// the results only when they were the newest to be published.
pub async fn search_preview(
    session: Arc<PreviewSession>,
    query: String,
    mode: SearchMode,
) -> Result<Option<MatchResult>, AppError> {
    let ticket = session.results().ticket();
    let worker = Arc::clone(&session);
    let results = tokio::task::spawn_blocking(move || worker.search(&query, mode))
        .await
        .map_err(|e| AppError::General(format!("search task failed: {e}")))?;

    if session.results().publish(ticket, results.clone()) {
        debug!(session_id = %session.id(), ticket, result_count = results.len(), "search published");
        Ok(Some(results))
    } else {
        debug!(session_id = %session.id(), ticket, "dropping stale search results");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, PreviewLimits};
    use crate::data::repository::tests::sample_document;
    use crate::models::document::NewDocument;
    use crate::services::locator_service::FileUriProvider;
    use std::path::Path;
    use url::Url;

    fn test_state(cache: &Path) -> Arc<AppState> {
        let config = AppConfig {
            cache_dir: cache.to_path_buf(),
            limits: PreviewLimits {
                max_text_lines: 3,
                ..PreviewLimits::default()
            },
            ..AppConfig::default()
        };
        Arc::new(AppState::in_memory(config, Arc::new(FileUriProvider)).unwrap())
    }

    fn insert_with_path(state: &AppState, path: &str) -> i64 {
        let doc = NewDocument {
            path: path.to_string(),
            ..sample_document("doc.txt")
        };
        repository::insert_document(&state.conn(), &doc).unwrap()
    }

    #[tokio::test]
    async fn test_preview_and_search_text_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "boot ok\nERROR disk full\nretry ok\nerror again\n").unwrap();
        let state = test_state(dir.path());
        let id = insert_with_path(&state, &path.to_string_lossy());

        let session = open_preview(Arc::clone(&state), id).await.unwrap();
        assert_eq!(session.content().full_text, "boot ok\nERROR disk full\nretry ok");
        assert!(session.content().is_truncated);

        let results = search_preview(Arc::clone(&session), "error".to_string(), SearchMode::Contains)
            .await
            .unwrap();
        assert_eq!(results, Some(vec!["...ERROR disk full...".to_string()]));
        assert_eq!(session.results().latest(), vec!["...ERROR disk full...".to_string()]);

        let results = search_preview(Arc::clone(&session), "OK".to_string(), SearchMode::EndsWith)
            .await
            .unwrap();
        assert_eq!(results, Some(vec!["boot ok".to_string(), "retry ok".to_string()]));
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let err = open_preview(state, 404).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_bad_paths_become_messages() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let blank = insert_with_path(&state, "");
        let session = open_preview(Arc::clone(&state), blank).await.unwrap();
        assert_eq!(session.content().full_text, BLANK_LOCATOR);

        let relative = insert_with_path(&state, "docs/report.pdf");
        let session = open_preview(Arc::clone(&state), relative).await.unwrap();
        assert_eq!(session.content().full_text, "unknown path format: docs/report.pdf");

        let gone = dir.path().join("gone.txt");
        let missing = insert_with_path(&state, &gone.to_string_lossy());
        let session = open_preview(Arc::clone(&state), missing).await.unwrap();
        assert_eq!(session.content().full_text, FILE_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unlocatable_documents_have_nothing_to_search() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());

        let blank = insert_with_path(&state, "");
        let session = open_preview(Arc::clone(&state), blank).await.unwrap();
        let results = search_preview(Arc::clone(&session), "path".to_string(), SearchMode::Contains)
            .await
            .unwrap();
        assert_eq!(results, Some(vec![]));

        let relative = insert_with_path(&state, "docs/report.pdf");
        let session = open_preview(Arc::clone(&state), relative).await.unwrap();
        let results =
            search_preview(Arc::clone(&session), "UNKNOWN".to_string(), SearchMode::StartsWith)
                .await
                .unwrap();
        assert_eq!(results, Some(vec![]));

        let gone = dir.path().join("gone.txt");
        let missing = insert_with_path(&state, &gone.to_string_lossy());
        let session = open_preview(Arc::clone(&state), missing).await.unwrap();
        let results = search_preview(Arc::clone(&session), "found".to_string(), SearchMode::Contains)
            .await
            .unwrap();
        assert_eq!(results, Some(vec![]));

        let remote = insert_with_path(&state, "content://nowhere/1");
        let session = open_preview(Arc::clone(&state), remote).await.unwrap();
        assert!(!session.is_searchable());
        assert!(session.search("a", SearchMode::Contains).is_empty());
    }

    #[tokio::test]
    async fn test_remote_copy_lives_as_long_as_the_session() {
        let source_dir = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let source = source_dir.path().join("memo.txt");
        std::fs::write(&source, "remote body\n").unwrap();
        let uri = Url::from_file_path(&source).unwrap().to_string();

        let state = test_state(cache.path());
        let id = insert_with_path(&state, &uri);

        let session = open_preview(Arc::clone(&state), id).await.unwrap();
        assert_eq!(session.content().full_text, "remote body");
        assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 1);

        drop(session);
        assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_older_search_cannot_overwrite_newer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "alpha\nbeta\n").unwrap();
        let state = test_state(dir.path());
        let id = insert_with_path(&state, &path.to_string_lossy());
        let session = open_preview(state, id).await.unwrap();

        let stale = session.results().ticket();
        let fresh = search_preview(Arc::clone(&session), "beta".to_string(), SearchMode::Contains)
            .await
            .unwrap();
        assert_eq!(fresh, Some(vec!["...beta...".to_string()]));

        assert!(!session.results().publish(stale, vec!["...alpha...".to_string()]));
        assert_eq!(session.results().latest(), vec!["...beta...".to_string()]);
    }
}
