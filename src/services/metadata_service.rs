use std::path::Path;

use tracing::{debug, warn};

use crate::services::format_reader::{run_guarded, DocumentFormat};
use crate::services::{ole, pdf_service};

/// Best-effort author lookup used at import time. Any failure yields an
/// empty string; the document is still registered.
pub fn extract_author(path: &Path, extension: &str) -> String {
    let Some(format) = DocumentFormat::from_extension(&extension.to_lowercase()) else {
        debug!(path = %path.display(), extension, "no author extractor for format");
        return String::new();
    };

    let result = run_guarded(|| match format {
        DocumentFormat::Pdf => pdf_service::read_author(path),
        DocumentFormat::Spreadsheet | DocumentFormat::Word => ole::read_author(path),
        DocumentFormat::Text => Ok(None),
    });

    match result {
        Ok(author) => author.unwrap_or_default(),
        Err(err) => {
            warn!(path = %path.display(), format = format.label(), error = %err, "author extraction failed");
            String::new()
        }
    }
}
