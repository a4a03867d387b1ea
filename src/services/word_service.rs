//! Text extraction for legacy Word (`.doc`, Word 97-2003) documents.
//!
//! The `WordDocument` stream starts with the FIB, which points into the
//! table stream (`0Table` or `1Table`) at the CLX. The CLX ends with the
//! piece table mapping character positions to byte runs in `WordDocument`;
//! each run is either cp1252 ("compressed") or UTF-16LE.

use std::path::Path;

use tracing::debug;

use crate::error::DecodeError;
use crate::models::content::DecodedContent;
use crate::services::format_reader::TRUNCATION_MARKER;
use crate::services::ole::{self, cp1252_char, read_u16, read_u32};

const WORD_DOCUMENT_STREAM: &str = "/WordDocument";
const TABLE_STREAM_0: &str = "/0Table";
const TABLE_STREAM_1: &str = "/1Table";
const MAX_STREAM_BYTES: u64 = 64 * 1024 * 1024;

const FIB_MAGIC: u16 = 0xA5EC;
const FIB_FLAGS: usize = 0x000A;
const FIB_CCP_TEXT: usize = 0x004C;
const FIB_FC_CLX: usize = 0x01A2;
const FIB_LCB_CLX: usize = 0x01A6;

const FLAG_ENCRYPTED: u16 = 0x0100;
const FLAG_WHICH_TABLE: u16 = 0x0200;

const CLX_PRC: u8 = 0x01;
const CLX_PCDT: u8 = 0x02;
const PCD_SIZE: usize = 8;
const FC_COMPRESSED: u32 = 0x4000_0000;

const FIELD_BEGIN: char = '\u{13}';
const FIELD_SEPARATOR: char = '\u{14}';
const FIELD_END: char = '\u{15}';

struct Fib {
    encrypted: bool,
    table_stream: &'static str,
    ccp_text: u32,
    fc_clx: u32,
    lcb_clx: u32,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self, DecodeError> {
        if read_u16(word, 0)? != FIB_MAGIC {
            return Err(DecodeError::Malformed(
                "WordDocument stream has no Word 97 header".to_string(),
            ));
        }
        let flags = read_u16(word, FIB_FLAGS)?;
        Ok(Self {
            encrypted: flags & FLAG_ENCRYPTED != 0,
            table_stream: if flags & FLAG_WHICH_TABLE != 0 {
                TABLE_STREAM_1
            } else {
                TABLE_STREAM_0
            },
            ccp_text: read_u32(word, FIB_CCP_TEXT)?,
            fc_clx: read_u32(word, FIB_FC_CLX)?,
            lcb_clx: read_u32(word, FIB_LCB_CLX)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    cp_start: u32,
    cp_end: u32,
    offset: usize,
    compressed: bool,
}

fn parse_piece_table(clx: &[u8]) -> Result<Vec<Piece>, DecodeError> {
    let mut pos = 0;
    while let Some(&kind) = clx.get(pos) {
        match kind {
            CLX_PRC => {
                let size = read_u16(clx, pos + 1)? as i16;
                if size < 0 {
                    return Err(DecodeError::Malformed("negative Prc size".to_string()));
                }
                pos += 3 + size as usize;
            }
            CLX_PCDT => {
                let len = read_u32(clx, pos + 1)? as usize;
                let plc = clx
                    .get(pos + 5..(pos + 5).saturating_add(len))
                    .ok_or_else(|| DecodeError::Malformed("piece table out of range".to_string()))?;
                return parse_plc_pcd(plc);
            }
            other => {
                return Err(DecodeError::Malformed(format!(
                    "unexpected CLX entry 0x{other:02x}"
                )))
            }
        }
    }
    Err(DecodeError::Malformed("piece table not found".to_string()))
}

fn parse_plc_pcd(plc: &[u8]) -> Result<Vec<Piece>, DecodeError> {
    // n + 1 character positions followed by n 8-byte descriptors.
    if plc.len() < 4 || (plc.len() - 4) % (4 + PCD_SIZE) != 0 {
        return Err(DecodeError::Malformed(format!(
            "piece table has invalid length {}",
            plc.len()
        )));
    }
    let count = (plc.len() - 4) / (4 + PCD_SIZE);
    let descriptors = (count + 1) * 4;

    let mut pieces = Vec::new();
    pieces.try_reserve_exact(count)?;
    for i in 0..count {
        let cp_start = read_u32(plc, i * 4)?;
        let cp_end = read_u32(plc, (i + 1) * 4)?;
        if cp_end < cp_start {
            return Err(DecodeError::Malformed(format!(
                "piece {i} ends before it starts"
            )));
        }
        let fc = read_u32(plc, descriptors + i * PCD_SIZE + 2)?;
        let compressed = fc & FC_COMPRESSED != 0;
        let offset = if compressed {
            ((fc & !FC_COMPRESSED) / 2) as usize
        } else {
            fc as usize
        };
        pieces.push(Piece {
            cp_start,
            cp_end,
            offset,
            compressed,
        });
    }
    Ok(pieces)
}

/// Collects visible characters, dropping field instructions and mapping
/// Word's control marks. Stops accepting once `limit` characters are held.
struct TextSink {
    out: String,
    chars: usize,
    limit: usize,
    // One entry per open field: true while inside its instruction part.
    fields: Vec<bool>,
}

impl TextSink {
    fn new(limit: usize) -> Self {
        Self {
            out: String::new(),
            chars: 0,
            limit,
            fields: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.chars >= self.limit
    }

    fn push(&mut self, c: char) -> Result<(), DecodeError> {
        match c {
            FIELD_BEGIN => {
                self.fields.push(true);
                return Ok(());
            }
            FIELD_SEPARATOR => {
                if let Some(top) = self.fields.last_mut() {
                    *top = false;
                }
                return Ok(());
            }
            FIELD_END => {
                self.fields.pop();
                return Ok(());
            }
            _ => {}
        }
        if self.fields.iter().any(|&in_code| in_code) {
            return Ok(());
        }

        let mapped = match c {
            '\r' | '\u{0B}' | '\u{0C}' => '\n',
            '\u{07}' => '\t',
            '\u{1E}' => '-',
            '\u{A0}' => ' ',
            '\t' | '\n' => c,
            c if c.is_control() => return Ok(()),
            c => c,
        };
        self.out.try_reserve(mapped.len_utf8())?;
        self.out.push(mapped);
        self.chars += 1;
        Ok(())
    }
}

fn collect_main_text(
    word: &[u8],
    pieces: &[Piece],
    ccp_text: u32,
    sink: &mut TextSink,
) -> Result<(), DecodeError> {
    for piece in pieces {
        if piece.cp_start >= ccp_text || sink.is_full() {
            break;
        }
        let count = (piece.cp_end.min(ccp_text) - piece.cp_start) as usize;
        let width = if piece.compressed { 1 } else { 2 };
        let bytes = word
            .get(piece.offset..piece.offset.saturating_add(count.saturating_mul(width)))
            .ok_or_else(|| {
                DecodeError::Malformed("piece points past the end of WordDocument".to_string())
            })?;

        if piece.compressed {
            for &b in bytes {
                if sink.is_full() {
                    break;
                }
                sink.push(cp1252_char(b))?;
            }
        } else {
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            for c in char::decode_utf16(units) {
                if sink.is_full() {
                    break;
                }
                sink.push(c.unwrap_or('\u{fffd}'))?;
            }
        }
    }
    Ok(())
}

/// Main-document text, cut to `max_chars` characters plus the truncation
/// marker when longer. Work stops one character past the cap.
pub fn extract_text(path: &Path, max_chars: usize) -> Result<DecodedContent, DecodeError> {
    let mut compound = ole::open(path)?;
    let word = ole::read_stream(&mut compound, WORD_DOCUMENT_STREAM, MAX_STREAM_BYTES)?;
    let fib = Fib::parse(&word)?;
    if fib.encrypted {
        return Err(DecodeError::Encrypted);
    }

    let table = ole::read_stream(&mut compound, fib.table_stream, MAX_STREAM_BYTES)?;
    let clx_start = fib.fc_clx as usize;
    let clx = table
        .get(clx_start..clx_start.saturating_add(fib.lcb_clx as usize))
        .ok_or_else(|| DecodeError::Malformed("CLX lies outside the table stream".to_string()))?;
    let pieces = parse_piece_table(clx)?;
    debug!(path = %path.display(), pieces = pieces.len(), ccp_text = fib.ccp_text, "parsed piece table");

    let mut sink = TextSink::new(max_chars.saturating_add(1));
    collect_main_text(&word, &pieces, fib.ccp_text, &mut sink)?;

    if sink.chars > max_chars {
        let cut = sink
            .out
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(sink.out.len());
        let mut text = sink.out;
        text.truncate(cut);
        text.try_reserve(TRUNCATION_MARKER.len())?;
        text.push_str(TRUNCATION_MARKER);
        return Ok(DecodedContent::truncated(text));
    }
    Ok(DecodedContent::complete(sink.out))
}
