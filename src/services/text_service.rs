use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::DecodeError;
use crate::models::content::DecodedContent;

/// Reads one line into `buf` without its terminator. A line ends at `\n`,
/// `\r\n` or a lone `\r`. Returns false at end of input.
fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    let mut read_any = false;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(read_any);
        }
        read_any = true;
        match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(idx) => {
                let ends_with_cr = available[idx] == b'\r';
                buf.extend_from_slice(&available[..idx]);
                reader.consume(idx + 1);
                if ends_with_cr && reader.fill_buf()?.first() == Some(&b'\n') {
                    reader.consume(1);
                }
                return Ok(true);
            }
            None => {
                let len = available.len();
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

/// Keeps the first `max_lines` lines and drops the rest without a marker.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn read_text(path: &Path, max_lines: usize) -> Result<DecodedContent, DecodeError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    while lines.len() < max_lines {
        if !next_line(&mut reader, &mut buf)? {
            return Ok(DecodedContent::complete(lines.join("\n")));
        }
        lines.push(String::from_utf8_lossy(&buf).into_owned());
    }

    let has_more = next_line(&mut reader, &mut buf)?;
    let text = lines.join("\n");
    Ok(if has_more {
        DecodedContent::truncated(text)
    } else {
        DecodedContent::complete(text)
    })
}
