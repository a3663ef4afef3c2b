//! Boundary-delimited multipart bodies (RFC 2046 §5.1).
//!
//! The reader walks a fully buffered container body and yields its child
//! parts in order. Each part borrows from the container buffer, so a part can
//! only be used while the reader it came from is alive.

use memchr::memmem;

use crate::error::{MimeboxError, Result};
use crate::parser::header::Headers;
use crate::parser::message::split_header_block;

/// One child part of a multipart container.
#[derive(Debug, Clone)]
pub struct Part<'a> {
    pub headers: Headers,
    pub body: &'a [u8],
}

/// Sequential reader over the child parts of one container.
pub struct MultipartReader<'a> {
    data: &'a [u8],
    delimiter: Vec<u8>,
    pos: usize,
    started: bool,
    finished: bool,
}

/// A delimiter line found in the container body.
struct Delimiter {
    /// Offset of the `--boundary` text.
    start: usize,
    /// Offset just past the delimiter line (after its line break, if any).
    next_line: usize,
    /// `true` for the `--boundary--` close delimiter.
    close: bool,
}

impl<'a> MultipartReader<'a> {
    pub fn new(data: &'a [u8], boundary: &str) -> Self {
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            data,
            delimiter,
            pos: 0,
            started: false,
            finished: false,
        }
    }

    /// Read the next child part.
    ///
    /// `Ok(None)` is the normal end-of-parts signal once the close delimiter
    /// has been seen; it is returned for every later call too.
    pub fn next_part(&mut self) -> Result<Option<Part<'a>>> {
        if self.finished {
            return Ok(None);
        }

        if !self.started {
            // Skip the preamble
            let first = self.find_delimiter(self.pos).ok_or_else(|| {
                MimeboxError::MultipartRead("no boundary delimiter found in body".to_string())
            })?;
            self.started = true;
            if first.close {
                self.finished = true;
                return Ok(None);
            }
            self.pos = first.next_line;
        }

        let next = self.find_delimiter(self.pos).ok_or_else(|| {
            MimeboxError::MultipartRead(
                "unexpected end of body before closing boundary delimiter".to_string(),
            )
        })?;

        // The header block is split before the delimiter's line break is
        // removed, so a blank line directly ahead of it ends the headers
        let raw = &self.data[self.pos..next.start];
        if next.close {
            self.finished = true;
        } else {
            self.pos = next.next_line;
        }

        let (header_bytes, body) = split_header_block(raw).ok_or_else(|| {
            MimeboxError::MultipartRead("part headers are not terminated by a blank line".to_string())
        })?;

        Ok(Some(Part {
            headers: Headers::parse(header_bytes),
            body: strip_delimiter_break(body),
        }))
    }

    /// Find the next delimiter line at or after `from`.
    ///
    /// A delimiter must start a line and be followed by `--`, by transport
    /// padding up to the line break, or by the end of the data.
    fn find_delimiter(&self, from: usize) -> Option<Delimiter> {
        let haystack = &self.data[from..];
        for rel in memmem::find_iter(haystack, &self.delimiter) {
            let start = from + rel;
            if start != from && self.data[start - 1] != b'\n' {
                continue;
            }
            let after = start + self.delimiter.len();
            let rest = &self.data[after..];

            if rest.starts_with(b"--") {
                return Some(Delimiter {
                    start,
                    next_line: line_end(self.data, after + 2),
                    close: true,
                });
            }

            let line = match memchr::memchr(b'\n', rest) {
                Some(nl) => &rest[..nl],
                None => rest,
            };
            if line.iter().all(|&b| b == b' ' || b == b'\t' || b == b'\r') {
                return Some(Delimiter {
                    start,
                    next_line: line_end(self.data, after),
                    close: false,
                });
            }
        }
        None
    }
}

/// Offset just past the line break that ends the line containing `from`.
fn line_end(data: &[u8], from: usize) -> usize {
    match memchr::memchr(b'\n', &data[from.min(data.len())..]) {
        Some(nl) => from + nl + 1,
        None => data.len(),
    }
}

/// Drop the line break that precedes a delimiter; it belongs to the delimiter.
fn strip_delimiter_break(body: &[u8]) -> &[u8] {
    body.strip_suffix(b"\r\n")
        .or_else(|| body.strip_suffix(b"\n"))
        .unwrap_or(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(data: &[u8], boundary: &str) -> Result<Vec<(Headers, Vec<u8>)>> {
        let mut reader = MultipartReader::new(data, boundary);
        let mut parts = Vec::new();
        while let Some(part) = reader.next_part()? {
            parts.push((part.headers, part.body.to_vec()));
        }
        Ok(parts)
    }

    #[test]
    fn test_two_parts_crlf() {
        let body = b"preamble\r\n--XYZ\r\nContent-Type: text/plain\r\n\r\nhello\r\n--XYZ\r\nContent-Type: text/html\r\n\r\n<b>hello</b>\r\n--XYZ--\r\nepilogue\r\n";
        let parts = collect(body, "XYZ").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0.get("content-type"), Some("text/plain"));
        assert_eq!(parts[0].1, b"hello");
        assert_eq!(parts[1].0.get("Content-Type"), Some("text/html"));
        assert_eq!(parts[1].1, b"<b>hello</b>");
    }

    #[test]
    fn test_lf_line_endings_and_padding() {
        let body = b"--b  \nContent-Type: text/plain\n\nline one\nline two\n--b--";
        let parts = collect(body, "b").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].1, b"line one\nline two");
    }

    #[test]
    fn test_end_of_parts_is_sticky() {
        let body = b"--b\n\nx\n--b--\n";
        let mut reader = MultipartReader::new(body, "b");
        assert!(reader.next_part().unwrap().is_some());
        assert!(reader.next_part().unwrap().is_none());
        assert!(reader.next_part().unwrap().is_none());
    }

    #[test]
    fn test_part_with_empty_headers() {
        let parts = collect(b"--b\r\n\r\nraw body\r\n--b--\r\n", "b").unwrap();
        assert!(parts[0].0.is_empty());
        assert_eq!(parts[0].1, b"raw body");
    }

    #[test]
    fn test_boundary_text_inside_line_is_not_a_delimiter() {
        let body = b"--b\n\nsee --b in text\n--bb is another boundary\n--b--\n";
        let parts = collect(body, "b").unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].1, b"see --b in text\n--bb is another boundary");
    }

    #[test]
    fn test_missing_boundary_is_an_error() {
        let err = collect(b"no delimiters here\n", "b").unwrap_err();
        assert!(matches!(err, MimeboxError::MultipartRead(_)));
    }

    #[test]
    fn test_missing_close_delimiter_is_an_error() {
        let err = collect(b"--b\n\nfirst\n--b\n\nsecond never closed\n", "b").unwrap_err();
        assert!(matches!(err, MimeboxError::MultipartRead(_)));
    }

    #[test]
    fn test_part_without_header_terminator_is_an_error() {
        let err = collect(b"--b\nContent-Type: text/plain\n--b--\n", "b").unwrap_err();
        assert!(matches!(err, MimeboxError::MultipartRead(_)));
    }

    #[test]
    fn test_part_with_headers_and_empty_body() {
        let body = b"--b\r\nContent-Type: text/plain\r\n\r\n--b\r\nContent-Type: text/html\r\n\r\n<p>x</p>\r\n--b--\r\n";
        let parts = collect(body, "b").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0.get("Content-Type"), Some("text/plain"));
        assert!(parts[0].1.is_empty());
        assert_eq!(parts[1].1, b"<p>x</p>");

        let lf = collect(b"--b\nContent-Type: text/plain\n\n--b--\n", "b").unwrap();
        assert_eq!(lf.len(), 1);
        assert!(lf[0].1.is_empty());
    }

    #[test]
    fn test_body_keeps_inner_blank_lines() {
        let parts = collect(b"--b\n\nline\n\n\n--b--\n", "b").unwrap();
        assert_eq!(parts[0].1, b"line\n\n");
    }

    #[test]
    fn test_empty_container() {
        assert!(collect(b"--b--\n", "b").unwrap().is_empty());
    }
}
