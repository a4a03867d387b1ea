//! Helpers for OLE compound documents (legacy `.doc` and `.xls`): bounded
//! stream reads, little-endian field access, cp1252 text, and the
//! `SummaryInformation` property set.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use cfb::CompoundFile;

use crate::error::DecodeError;

pub const SUMMARY_INFORMATION_STREAM: &str = "/\u{5}SummaryInformation";

const PROPERTY_SET_BYTE_ORDER: u16 = 0xFFFE;
const FIRST_SECTION_OFFSET_FIELD: usize = 44;
const MAX_PROPERTY_SET_BYTES: u64 = 1024 * 1024;

const PID_CODEPAGE: u32 = 1;
pub const PID_AUTHOR: u32 = 4;

const VT_I2: u32 = 0x02;
const VT_LPSTR: u32 = 0x1E;
const VT_LPWSTR: u32 = 0x1F;

const CODEPAGE_UTF16: u16 = 1200;
const CODEPAGE_UTF8: u16 = 65001;

/// cp1252 code points for bytes 0x80..=0x9F; undefined slots keep the byte value.
const CP1252_HIGH: [u16; 32] = [
    0x20AC, 0x0081, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160,
    0x2039, 0x0152, 0x008D, 0x017D, 0x008F, 0x0090, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022,
    0x2013, 0x2014, 0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x009D, 0x017E, 0x0178,
];

pub fn open(path: &Path) -> Result<CompoundFile<File>, DecodeError> {
    cfb::open(path)
        .map_err(|e| DecodeError::Malformed(format!("not an OLE compound document: {e}")))
}

/// Reads a whole stream. The buffer is reserved up front from the stream's
/// declared length so an absurd claim fails as out-of-memory, not mid-read.
pub fn read_stream(
    compound: &mut CompoundFile<File>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, DecodeError> {
    let mut stream = compound
        .open_stream(name)
        .map_err(|e| DecodeError::Malformed(format!("missing stream {name}: {e}")))?;
    let len = stream.len();
    if len > max_bytes {
        return Err(DecodeError::Malformed(format!(
            "stream {name} is {len} bytes, limit is {max_bytes}"
        )));
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(len as usize)?;
    stream.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let bytes: [u8; 2] = buf
        .get(offset..offset.saturating_add(2))
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| out_of_bounds(offset))?;
    Ok(u16::from_le_bytes(bytes))
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let bytes: [u8; 4] = buf
        .get(offset..offset.saturating_add(4))
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| out_of_bounds(offset))?;
    Ok(u32::from_le_bytes(bytes))
}

fn out_of_bounds(offset: usize) -> DecodeError {
    DecodeError::Malformed(format!("unexpected end of data at offset {offset}"))
}

pub fn cp1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => {
            char::from_u32(u32::from(CP1252_HIGH[usize::from(byte - 0x80)])).unwrap_or('\u{fffd}')
        }
        _ => char::from(byte),
    }
}

pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or('\u{fffd}'))
        .collect()
}

fn decode_codepage(bytes: &[u8], codepage: u16) -> String {
    match codepage {
        CODEPAGE_UTF16 => decode_utf16le(bytes),
        CODEPAGE_UTF8 => String::from_utf8_lossy(bytes).into_owned(),
        _ => bytes.iter().map(|&b| cp1252_char(b)).collect(),
    }
}

/// The first section of a serialized property set.
struct PropertySection<'a> {
    data: &'a [u8],
    entries: Vec<(u32, usize)>,
}

impl<'a> PropertySection<'a> {
    fn parse(stream: &'a [u8]) -> Result<Self, DecodeError> {
        if read_u16(stream, 0)? != PROPERTY_SET_BYTE_ORDER {
            return Err(DecodeError::Malformed(
                "property set has an unknown byte order".to_string(),
            ));
        }
        let section_start = read_u32(stream, FIRST_SECTION_OFFSET_FIELD)? as usize;
        let section_len = read_u32(stream, section_start)? as usize;
        let data = stream
            .get(section_start..section_start.saturating_add(section_len))
            .ok_or_else(|| DecodeError::Malformed("property section out of range".to_string()))?;

        let count = read_u32(data, 4)? as usize;
        // Each entry takes 8 bytes after the 8-byte section header.
        if count > data.len().saturating_sub(8) / 8 {
            return Err(DecodeError::Malformed(format!(
                "property section claims {count} entries"
            )));
        }
        let entries = (0..count)
            .map(|i| {
                let at = 8 + i * 8;
                Ok((read_u32(data, at)?, read_u32(data, at + 4)? as usize))
            })
            .collect::<Result<Vec<_>, DecodeError>>()?;

        Ok(Self { data, entries })
    }

    fn offset_of(&self, pid: u32) -> Option<usize> {
        self.entries
            .iter()
            .find(|(id, _)| *id == pid)
            .map(|(_, offset)| *offset)
    }

    fn codepage(&self) -> u16 {
        let Some(offset) = self.offset_of(PID_CODEPAGE) else {
            return 0;
        };
        match read_u32(self.data, offset) {
            Ok(VT_I2) => read_u16(self.data, offset.saturating_add(4)).unwrap_or(0),
            _ => 0,
        }
    }

    fn string(&self, pid: u32) -> Result<Option<String>, DecodeError> {
        let Some(offset) = self.offset_of(pid) else {
            return Ok(None);
        };
        let kind = read_u32(self.data, offset)?;
        let count = read_u32(self.data, offset.saturating_add(4))? as usize;
        let start = offset.saturating_add(8);
        let text = match kind {
            VT_LPSTR => {
                let bytes = self
                    .data
                    .get(start..start.saturating_add(count))
                    .ok_or_else(|| out_of_bounds(start))?;
                decode_codepage(bytes, self.codepage())
            }
            VT_LPWSTR => {
                let bytes = self
                    .data
                    .get(start..start.saturating_add(count.saturating_mul(2)))
                    .ok_or_else(|| out_of_bounds(start))?;
                decode_utf16le(bytes)
            }
            other => {
                return Err(DecodeError::Malformed(format!(
                    "property {pid} has unexpected type 0x{other:x}"
                )))
            }
        };
        Ok(Some(text.trim_end_matches('\0').to_string()))
    }
}

/// Author from the `SummaryInformation` stream, if the document carries one.
pub fn read_author(path: &Path) -> Result<Option<String>, DecodeError> {
    let mut compound = open(path)?;
    if !compound.is_stream(SUMMARY_INFORMATION_STREAM) {
        return Ok(None);
    }
    let stream = read_stream(&mut compound, SUMMARY_INFORMATION_STREAM, MAX_PROPERTY_SET_BYTES)?;
    PropertySection::parse(&stream)?.string(PID_AUTHOR)
}
