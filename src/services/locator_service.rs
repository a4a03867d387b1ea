use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};
use url::Url;

use crate::error::AppError;

pub const BLANK_LOCATOR: &str = "file path not found";
const TEMP_PREFIX: &str = "docshelf_";
const FALLBACK_EXTENSION: &str = "tmp";

/// Source of bytes for locators that are not plain filesystem paths.
pub trait ContentProvider: Send + Sync {
    /// Full media type such as `application/vnd.ms-excel`, when known.
    fn content_type(&self, locator: &str) -> Option<String>;

    fn display_name(&self, locator: &str) -> Option<String>;

    /// `Ok(None)` when the provider has no stream for this locator.
    fn open(&self, locator: &str) -> io::Result<Option<Box<dyn Read + '_>>>;

    /// Milliseconds since the epoch, when the provider tracks it.
    fn last_modified(&self, _locator: &str) -> Option<i64> {
        None
    }
}

/// Serves `file://` URIs from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileUriProvider;

impl FileUriProvider {
    fn path_of(locator: &str) -> Option<PathBuf> {
        let url = Url::parse(locator).ok()?;
        if url.scheme() != "file" {
            return None;
        }
        url.to_file_path().ok()
    }
}

impl ContentProvider for FileUriProvider {
    fn content_type(&self, _locator: &str) -> Option<String> {
        None
    }

    fn display_name(&self, locator: &str) -> Option<String> {
        Self::path_of(locator)?
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    fn open(&self, locator: &str) -> io::Result<Option<Box<dyn Read + '_>>> {
        let Some(path) = Self::path_of(locator) else {
            return Ok(None);
        };
        match File::open(path) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn last_modified(&self, locator: &str) -> Option<i64> {
        let modified = Self::path_of(locator)?.metadata().ok()?.modified().ok()?;
        Some(chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorKind {
    Blank,
    Direct,
    Remote,
    Unknown,
}

impl LocatorKind {
    pub fn classify(locator: &str) -> Self {
        let locator = locator.trim();
        if locator.is_empty() {
            Self::Blank
        } else if Path::new(locator).is_absolute() {
            Self::Direct
        } else if has_scheme(locator) {
            Self::Remote
        } else {
            Self::Unknown
        }
    }
}

fn has_scheme(locator: &str) -> bool {
    match locator.split_once("://") {
        Some((scheme, _)) => {
            scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// A readable local file for one preview. Temporary copies are removed when
/// this is dropped.
#[derive(Debug)]
pub enum LocalFile {
    Direct(PathBuf),
    Temporary(TempPath),
}

impl LocalFile {
    pub fn path(&self) -> &Path {
        match self {
            Self::Direct(path) => path.as_path(),
            Self::Temporary(temp) => temp,
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

pub fn resolve_locator(
    locator: &str,
    provider: &dyn ContentProvider,
    cache_dir: &Path,
) -> Result<LocalFile, AppError> {
    match LocatorKind::classify(locator) {
        LocatorKind::Blank => Err(AppError::NotFound(BLANK_LOCATOR.to_string())),
        LocatorKind::Direct => Ok(LocalFile::Direct(PathBuf::from(locator.trim()))),
        LocatorKind::Remote => materialize(locator.trim(), provider, cache_dir),
        LocatorKind::Unknown => {
            warn!(locator, "unknown path format");
            Err(AppError::General(format!("unknown path format: {locator}")))
        }
    }
}

fn materialize(
    locator: &str,
    provider: &dyn ContentProvider,
    cache_dir: &Path,
) -> Result<LocalFile, AppError> {
    let extension = infer_extension(locator, provider.content_type(locator).as_deref());
    std::fs::create_dir_all(cache_dir)?;

    let mut source = provider
        .open(locator)
        .map_err(|e| AppError::Locator(format!("cannot open {locator}: {e}")))?
        .ok_or_else(|| AppError::Locator(format!("no content available for {locator}")))?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(&format!(".{extension}"))
        .tempfile_in(cache_dir)
        .map_err(|e| AppError::Locator(format!("failed to create temp file: {e}")))?;
    // On error `temp` drops here and the partial copy is removed.
    let copied = io::copy(&mut source, temp.as_file_mut())
        .map_err(|e| AppError::Locator(format!("failed to copy {locator}: {e}")))?;

    debug!(locator, bytes = copied, path = %temp.path().display(), "materialized temp copy");
    Ok(LocalFile::Temporary(temp.into_temp_path()))
}

/// Extension for a temp copy: the media subtype, else the extension of the
/// last path segment, else `tmp`.
pub fn infer_extension(locator: &str, content_type: Option<&str>) -> String {
    let from_type = content_type
        .and_then(|ct| ct.rsplit_once('/'))
        .map(|(_, subtype)| subtype.split(';').next().unwrap_or(subtype).trim())
        .map(|subtype| subtype.strip_prefix("vnd.").unwrap_or(subtype).to_string());

    let from_segment = || {
        let without_query = locator.split(['?', '#']).next().unwrap_or(locator);
        let segment = without_query.trim_end_matches('/').rsplit('/').next()?;
        segment
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
    };

    let candidate = from_type.or_else(from_segment).unwrap_or_default();
    let cleaned: String = candidate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_lowercase();
    if cleaned.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        cleaned
    }
}

/// Name of the last path segment of a URI, percent-decoded.
pub fn uri_file_name(locator: &str) -> Option<String> {
    let url = Url::parse(locator).ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode_binary(segment.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded).into_owned();
    (!decoded.is_empty()).then_some(decoded)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;

    /// In-memory provider keyed by locator.
    #[derive(Default)]
    pub(crate) struct MemoryProvider {
        pub(crate) items: HashMap<String, (Option<String>, Option<String>, Vec<u8>)>,
    }

    impl MemoryProvider {
        pub(crate) fn with(
            mut self,
            locator: &str,
            content_type: Option<&str>,
            name: Option<&str>,
            body: &[u8],
        ) -> Self {
            self.items.insert(
                locator.to_string(),
                (
                    content_type.map(str::to_string),
                    name.map(str::to_string),
                    body.to_vec(),
                ),
            );
            self
        }
    }

    impl ContentProvider for MemoryProvider {
        fn content_type(&self, locator: &str) -> Option<String> {
            self.items.get(locator)?.0.clone()
        }

        fn display_name(&self, locator: &str) -> Option<String> {
            self.items.get(locator)?.1.clone()
        }

        fn open(&self, locator: &str) -> io::Result<Option<Box<dyn Read + '_>>> {
            Ok(self
                .items
                .get(locator)
                .map(|(_, _, body)| Box::new(Cursor::new(body.as_slice())) as Box<dyn Read + '_>))
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(LocatorKind::classify(""), LocatorKind::Blank);
        assert_eq!(LocatorKind::classify("   "), LocatorKind::Blank);
        assert_eq!(LocatorKind::classify("content://media/42"), LocatorKind::Remote);
        assert_eq!(LocatorKind::classify("file:///tmp/a.txt"), LocatorKind::Remote);
        assert_eq!(LocatorKind::classify("relative/notes.txt"), LocatorKind::Unknown);
        assert_eq!(LocatorKind::classify("://nothing"), LocatorKind::Unknown);
        let absolute = std::env::temp_dir().join("notes.txt");
        assert_eq!(
            LocatorKind::classify(&absolute.to_string_lossy()),
            LocatorKind::Direct
        );
    }

    #[test]
    fn test_blank_and_unknown_locators() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MemoryProvider::default();

        let err = resolve_locator("", &provider, dir.path()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == BLANK_LOCATOR));

        let err = resolve_locator("notes.txt", &provider, dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "unknown path format: notes.txt");
    }

    #[test]
    fn test_direct_path_is_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let local =
            resolve_locator(&path.to_string_lossy(), &MemoryProvider::default(), dir.path())
                .unwrap();
        assert!(!local.is_temporary());
        assert_eq!(local.path(), path.as_path());
    }

    #[test]
    fn test_remote_locator_is_copied_and_cleaned_up() {
        let cache = tempfile::tempdir().unwrap();
        let provider = MemoryProvider::default().with(
            "content://docs/7",
            Some("application/vnd.ms-excel"),
            Some("budget.xls"),
            b"sheet bytes",
        );

        let local = resolve_locator("content://docs/7", &provider, cache.path()).unwrap();
        let temp_path = local.path().to_path_buf();
        assert!(local.is_temporary());
        assert_eq!(std::fs::read(&temp_path).unwrap(), b"sheet bytes");
        assert!(temp_path.starts_with(cache.path()));
        let file_name = temp_path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with(TEMP_PREFIX));
        assert!(file_name.ends_with(".ms-excel"));

        drop(local);
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_remote_without_content_is_a_locator_error() {
        let cache = tempfile::tempdir().unwrap();
        let err = resolve_locator("content://docs/404", &MemoryProvider::default(), cache.path())
            .unwrap_err();
        assert!(matches!(err, AppError::Locator(_)));
        assert_eq!(std::fs::read_dir(cache.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_file_uri_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report 1.txt");
        std::fs::write(&path, "hello").unwrap();
        let uri = Url::from_file_path(&path).unwrap().to_string();

        let provider = FileUriProvider;
        assert_eq!(provider.display_name(&uri).as_deref(), Some("report 1.txt"));
        assert!(provider.last_modified(&uri).is_some());

        let local = resolve_locator(&uri, &provider, dir.path()).unwrap();
        assert!(local.path().to_string_lossy().ends_with(".txt"));
        assert_eq!(std::fs::read_to_string(local.path()).unwrap(), "hello");

        let missing = Url::from_file_path(dir.path().join("gone.txt")).unwrap().to_string();
        assert!(provider.open(&missing).unwrap().is_none());
    }

    #[test]
    fn test_infer_extension() {
        assert_eq!(infer_extension("content://x/1", Some("application/pdf")), "pdf");
        assert_eq!(infer_extension("content://x/1", Some("application/msword")), "msword");
        assert_eq!(infer_extension("content://x/1", Some("text/plain; charset=utf-8")), "plain");
        assert_eq!(infer_extension("content://x/report.DOC", None), "doc");
        assert_eq!(infer_extension("content://x/report.doc?dl=1", None), "doc");
        assert_eq!(infer_extension("content://x/12345", None), "tmp");
        assert_eq!(infer_extension("content://x/", None), "tmp");
    }

    #[test]
    fn test_uri_file_name() {
        assert_eq!(
            uri_file_name("content://docs/folder/Q3%20report.pdf").as_deref(),
            Some("Q3 report.pdf")
        );
        assert_eq!(uri_file_name("content://docs/").as_deref(), None);
        assert_eq!(uri_file_name("not a uri"), None);
    }
}
