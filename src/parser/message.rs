//! Message framing: split raw RFC 5322 bytes into a header set and an
//! unconsumed body.

use std::path::Path;

use crate::error::{MimeboxError, Result};
use crate::parser::header::Headers;

/// A message separated into its top-level headers and body bytes.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl RawMessage {
    /// Frame a complete raw message.
    ///
    /// A leading BOM and mbox `From ` separator line are skipped. A message
    /// without a blank line is treated as headers only.
    pub fn parse(raw: &[u8]) -> Self {
        let data = skip_from_line(raw);
        let (header_bytes, body) = split_header_block(data).unwrap_or((data, &[]));
        Self {
            headers: Headers::parse(header_bytes),
            body: body.to_vec(),
        }
    }
}

/// Read and frame a single `.eml` file.
pub fn read_eml(path: impl AsRef<Path>) -> Result<RawMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            MimeboxError::FileNotFound(path.to_path_buf())
        } else {
            MimeboxError::io(path, e)
        }
    })?;
    Ok(RawMessage::parse(&data))
}

/// Split a header block from the bytes that follow it.
///
/// Returns `None` when no blank line terminates the headers. An input that
/// starts with a blank line has an empty header block.
pub fn split_header_block(data: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(rest) = data.strip_prefix(b"\r\n") {
        return Some((&[], rest));
    }
    if let Some(rest) = data.strip_prefix(b"\n") {
        return Some((&[], rest));
    }

    let end = find_header_end(data)?;
    let body_start = if data[end..].starts_with(b"\r\n\r\n") {
        end + 4
    } else if data[end..].starts_with(b"\n\r\n") {
        end + 3
    } else {
        end + 2
    };
    Some((&data[..end], &data[body_start..]))
}

/// Find the byte offset where headers end (the line break before the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if data[i] == b'\n' && data[i + 1..].starts_with(b"\r\n") {
            return Some(i);
        }
        if data[i..].starts_with(b"\r\n\r\n") {
            return Some(i);
        }
    }
    None
}

/// Skip a BOM and the `From ` separator line at the start of mbox messages.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
