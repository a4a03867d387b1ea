use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::config::PreviewLimits;
use crate::error::DecodeError;
use crate::models::content::DecodedContent;
use crate::services::{pdf_service, spreadsheet_service, text_service, word_service};

/// Appended when a decoder stops at its cap.
pub const TRUNCATION_MARKER: &str = "\n\n... (content truncated)";
pub const FILE_NOT_FOUND: &str = "file not found";

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Pdf,
    Spreadsheet,
    Word,
}

impl DocumentFormat {
    /// Dispatch is by extension only; content is never sniffed.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            "txt" | "plain" => Some(Self::Text),
            "pdf" => Some(Self::Pdf),
            "xls" | "ms-excel" => Some(Self::Spreadsheet),
            "doc" | "msword" => Some(Self::Word),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Pdf => "pdf",
            Self::Spreadsheet => "xls",
            Self::Word => "doc",
        }
    }
}

pub fn normalized_extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

pub fn unsupported_format_message(extension: &str) -> String {
    format!("unsupported file format: {extension}")
}

fn too_large_message(limits: &PreviewLimits) -> String {
    format!(
        "file too large (max {}MB)",
        limits.max_file_bytes / BYTES_PER_MB
    )
}

fn failure_message(format: DocumentFormat, err: &DecodeError) -> String {
    match err {
        DecodeError::OutOfMemory => format!(
            "{} file too large or complex, memory error",
            format.label()
        ),
        DecodeError::NoSheets => "excel file has no sheets".to_string(),
        other => format!("{} read error: {other}", format.label()),
    }
}

/// Runs a decoder so that a panic inside it surfaces as a [`DecodeError`]
/// instead of unwinding into the caller.
pub(crate) fn run_guarded<T>(
    decode: impl FnOnce() -> Result<T, DecodeError>,
) -> Result<T, DecodeError> {
    match panic::catch_unwind(AssertUnwindSafe(decode)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            if message.contains("capacity overflow") || message.contains("memory allocation") {
                Err(DecodeError::OutOfMemory)
            } else {
                Err(DecodeError::Panicked(message))
            }
        }
    }
}

/// Turns a document on disk into bounded preview text. Never fails: every
/// rejection or decode failure becomes a message shown in place of content.
#[derive(Debug, Clone, Default)]
pub struct FormatReader {
    limits: PreviewLimits,
}

impl FormatReader {
    pub fn new(limits: PreviewLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &PreviewLimits {
        &self.limits
    }

    pub fn read_file(&self, path: &Path) -> String {
        self.read(path).full_text
    }

    pub fn read(&self, path: &Path) -> DecodedContent {
        let metadata = match fs::metadata(path) {
            Ok(meta) if meta.is_file() => meta,
            _ => {
                warn!(path = %path.display(), "file not found");
                return DecodedContent::message(FILE_NOT_FOUND);
            }
        };
        if metadata.len() > self.limits.max_file_bytes {
            warn!(path = %path.display(), size = metadata.len(), "file exceeds preview size cap");
            return DecodedContent::message(too_large_message(&self.limits));
        }

        let extension = normalized_extension(path);
        let Some(format) = DocumentFormat::from_extension(&extension) else {
            warn!(path = %path.display(), extension = %extension, "unsupported format");
            return DecodedContent::message(unsupported_format_message(&extension));
        };

        debug!(path = %path.display(), format = format.label(), "decoding document");
        match run_guarded(|| self.decode(format, path)) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), format = format.label(), error = %err, "decode failed");
                DecodedContent::message(failure_message(format, &err))
            }
        }
    }

    fn decode(&self, format: DocumentFormat, path: &Path) -> Result<DecodedContent, DecodeError> {
        match format {
            DocumentFormat::Text => text_service::read_text(path, self.limits.max_text_lines),
            DocumentFormat::Pdf => pdf_service::extract_text(path),
            DocumentFormat::Spreadsheet => {
                spreadsheet_service::extract_text(path, self.limits.max_sheet_rows)
            }
            DocumentFormat::Word => word_service::extract_text(path, self.limits.max_word_chars),
        }
    }
}
