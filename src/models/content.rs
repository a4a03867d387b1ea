use serde::{Deserialize, Serialize};

/// Text produced by the format reader for one preview. Lives only as long as
/// the preview session that owns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedContent {
    pub full_text: String,
    pub is_truncated: bool,
}

impl DecodedContent {
    pub fn complete(full_text: String) -> Self {
        Self {
            full_text,
            is_truncated: false,
        }
    }

    pub fn truncated(full_text: String) -> Self {
        Self {
            full_text,
            is_truncated: true,
        }
    }

    /// A failure message shown in place of the document body.
    pub fn message(text: impl Into<String>) -> Self {
        Self::complete(text.into())
    }
}
