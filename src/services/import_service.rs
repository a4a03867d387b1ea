use std::fs;
use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::config::AppConfig;
use crate::data::repository;
use crate::error::AppError;
use crate::models::document::{DocumentRecord, NewDocument};
use crate::services::locator_service::{self, ContentProvider, LocalFile, LocatorKind};
use crate::services::metadata_service;

const FALLBACK_MIME: &str = "file";

/// Text after the last dot, case kept. Empty when there is no dot or the
/// name ends with one.
pub fn name_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx + 1..],
        _ => "",
    }
}

fn display_name(locator: &str, local: &LocalFile, provider: &dyn ContentProvider) -> Option<String> {
    match local {
        LocalFile::Direct(path) => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned()),
        LocalFile::Temporary(_) => provider
            .display_name(locator)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| locator_service::uri_file_name(locator)),
    }
}

fn mime_type(name: &str, content_type: Option<&str>) -> String {
    let extension = name_extension(name);
    if !extension.is_empty() {
        return extension.to_string();
    }
    content_type
        .and_then(|ct| ct.rsplit_once('/'))
        .map(|(_, subtype)| subtype.to_string())
        .filter(|subtype| !subtype.is_empty())
        .unwrap_or_else(|| FALLBACK_MIME.to_string())
}

fn modified_millis(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let millis = chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis();
    (millis > 0).then_some(millis)
}

/// Gathers everything stored for a new document. Remote locators are copied
/// to the cache for the duration of the call so the author can be read.
pub fn prepare_document(
    locator: &str,
    provider: &dyn ContentProvider,
    config: &AppConfig,
) -> Result<NewDocument, AppError> {
    let locator = locator.trim();
    let local = locator_service::resolve_locator(locator, provider, &config.cache_dir)?;
    let metadata = fs::metadata(local.path())
        .map_err(|e| AppError::NotFound(format!("{locator}: {e}")))?;
    if !metadata.is_file() {
        return Err(AppError::General(format!("not a file: {locator}")));
    }

    let name = display_name(locator, &local, provider)
        .ok_or_else(|| AppError::General(format!("cannot determine a name for {locator}")))?;
    let mime_type = mime_type(&name, provider.content_type(locator).as_deref());

    let last_modified_time_stamp = match LocatorKind::classify(locator) {
        LocatorKind::Direct => modified_millis(local.path()),
        _ => provider.last_modified(locator).filter(|millis| *millis > 0),
    }
    .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    let author_key = mime_type.strip_prefix("vnd.").unwrap_or(&mime_type);
    let author = metadata_service::extract_author(local.path(), author_key);

    Ok(NewDocument {
        name,
        mime_type,
        size_in_bytes: i64::try_from(metadata.len()).unwrap_or(i64::MAX),
        path: locator.to_string(),
        last_modified_time_stamp,
        owner: config.owner.clone(),
        author,
    })
}

pub fn store_document(conn: &Connection, doc: NewDocument) -> Result<DocumentRecord, AppError> {
    let id = repository::insert_document(conn, &doc)?;
    info!(document_id = id, name = %doc.name, mime = %doc.mime_type, "document imported");
    Ok(doc.into_record(id))
}

pub fn import_document(
    conn: &Connection,
    locator: &str,
    provider: &dyn ContentProvider,
    config: &AppConfig,
) -> Result<DocumentRecord, AppError> {
    let doc = prepare_document(locator, provider, config)?;
    store_document(conn, doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repository::tests::setup_db;
    use crate::services::locator_service::tests::MemoryProvider;
    use crate::services::locator_service::FileUriProvider;
    use crate::services::ole::tests::{summary_information, write_compound};
    use crate::services::ole::SUMMARY_INFORMATION_STREAM;

    fn test_config(cache: &Path) -> AppConfig {
        AppConfig {
            cache_dir: cache.to_path_buf(),
            owner: "tester".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_name_extension() {
        assert_eq!(name_extension("report.PDF"), "PDF");
        assert_eq!(name_extension("archive.tar.gz"), "gz");
        assert_eq!(name_extension("README"), "");
        assert_eq!(name_extension("trailing."), "");
        assert_eq!(name_extension(".profile"), "profile");
    }

    #[test]
    fn test_mime_type_fallbacks() {
        assert_eq!(mime_type("notes.txt", Some("application/pdf")), "txt");
        assert_eq!(mime_type("ledger", Some("application/vnd.ms-excel")), "vnd.ms-excel");
        assert_eq!(mime_type("ledger", Some("garbage")), "file");
        assert_eq!(mime_type("ledger", None), "file");
    }

    #[test]
    fn test_import_direct_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minutes.txt");
        fs::write(&path, "agenda\nactions\n").unwrap();
        let conn = setup_db();
        let config = test_config(dir.path());

        let record =
            import_document(&conn, &path.to_string_lossy(), &FileUriProvider, &config).unwrap();
        assert!(record.id > 0);
        assert_eq!(record.name, "minutes.txt");
        assert_eq!(record.mime_type, "txt");
        assert_eq!(record.size_in_bytes, 15);
        assert_eq!(record.path, path.to_string_lossy());
        assert_eq!(record.owner, "tester");
        assert_eq!(record.author, "");
        assert!(record.last_modified_time_stamp > 0);

        let stored = repository::get_document(&conn, record.id).unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn test_import_remote_document_reads_author_and_cleans_up() {
        let cache = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let source = staging.path().join("source.doc");
        let summary = summary_information(b"Grace Hopper", 1252);
        write_compound(&source, &[(SUMMARY_INFORMATION_STREAM, summary.as_slice())]);
        let body = fs::read(&source).unwrap();

        let provider = MemoryProvider::default().with(
            "content://docs/9",
            Some("application/msword"),
            Some("Letter.doc"),
            &body,
        );
        let conn = setup_db();
        let record =
            import_document(&conn, "content://docs/9", &provider, &test_config(cache.path()))
                .unwrap();

        assert_eq!(record.name, "Letter.doc");
        assert_eq!(record.mime_type, "doc");
        assert_eq!(record.author, "Grace Hopper");
        assert_eq!(record.size_in_bytes, body.len() as i64);
        assert_eq!(record.path, "content://docs/9");
        assert_eq!(fs::read_dir(cache.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_import_without_display_name_uses_uri_segment() {
        let cache = tempfile::tempdir().unwrap();
        let provider =
            MemoryProvider::default().with("content://docs/Q3%20plan", None, None, b"x");

        let doc = prepare_document("content://docs/Q3%20plan", &provider, &test_config(cache.path()))
            .unwrap();
        assert_eq!(doc.name, "Q3 plan");
        assert_eq!(doc.mime_type, "file");
    }

    #[test]
    fn test_import_rejects_bad_locators() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let blank = prepare_document("  ", &FileUriProvider, &config).unwrap_err();
        assert!(matches!(blank, AppError::NotFound(_)));

        let missing = dir.path().join("gone.pdf");
        let err = prepare_document(&missing.to_string_lossy(), &FileUriProvider, &config)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = prepare_document(&dir.path().to_string_lossy(), &FileUriProvider, &config)
            .unwrap_err();
        assert!(matches!(err, AppError::General(_)));
    }
}
