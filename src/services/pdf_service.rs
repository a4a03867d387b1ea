use std::fs;
use std::path::Path;

use lopdf::{Document, Object};

use crate::error::DecodeError;
use crate::models::content::DecodedContent;

/// Full text of every page. PDFs have no preview cap beyond the file size
/// check done by the format reader.
pub fn extract_text(path: &Path) -> Result<DecodedContent, DecodeError> {
    let bytes = fs::read(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    Ok(DecodedContent::complete(text))
}

/// `Author` from the document information dictionary, if any.
pub fn read_author(path: &Path) -> Result<Option<String>, DecodeError> {
    let doc = Document::load(path).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let Ok(info) = doc.trailer.get(b"Info") else {
        return Ok(None);
    };
    let info = resolve(&doc, info)?
        .as_dict()
        .map_err(|e| DecodeError::Malformed(format!("Info is not a dictionary: {e}")))?;
    let Ok(author) = info.get(b"Author") else {
        return Ok(None);
    };
    let Ok(raw) = resolve(&doc, author)?.as_str() else {
        return Ok(None);
    };

    let author = decode_text_string(raw);
    let author = author.trim();
    Ok((!author.is_empty()).then(|| author.to_string()))
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object, DecodeError> {
    doc.dereference(object)
        .map(|(_, obj)| obj)
        .map_err(|e| DecodeError::Malformed(e.to_string()))
}

/// PDF text strings are UTF-16BE when they carry a byte order mark and
/// PDFDocEncoding otherwise, which agrees with Latin-1 for printable text.
fn decode_text_string(raw: &[u8]) -> String {
    if let Some(utf16) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        return char::decode_utf16(units)
            .map(|c| c.unwrap_or('\u{fffd}'))
            .collect();
    }
    if let Some(utf8) = raw.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    raw.iter().map(|&b| char::from(b)).collect()
}
