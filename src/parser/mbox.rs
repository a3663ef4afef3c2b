//! Streaming mbox splitter.
//!
//! Reads line-by-line through a buffered reader and hands each complete
//! message to a callback. Never holds more than one message in memory.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use crate::config::PerformanceConfig;
use crate::error::{MimeboxError, Result};

/// Splits an mbox stream into raw messages.
///
/// Tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (logs a warning)
/// - Truncated messages at EOF
/// - UTF-8 BOM at the start of the file
#[derive(Debug, Clone)]
pub struct MboxSplitter {
    read_buffer_size: usize,
    max_message_size: usize,
}

impl Default for MboxSplitter {
    fn default() -> Self {
        Self::new(&PerformanceConfig::default())
    }
}

impl MboxSplitter {
    pub fn new(config: &PerformanceConfig) -> Self {
        Self {
            read_buffer_size: config.read_buffer_size.max(4096),
            max_message_size: config.max_message_size,
        }
    }

    /// Split an mbox file, calling `message_callback` with `(offset, raw_bytes)`
    /// for each message. The callback returns `false` to stop early.
    ///
    /// Returns the number of messages delivered.
    pub fn split_file(
        &self,
        path: &Path,
        message_callback: &mut dyn FnMut(u64, &[u8]) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MimeboxError::FileNotFound(path.to_path_buf())
            } else {
                MimeboxError::io(path, e)
            }
        })?;
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);
        let reader = BufReader::with_capacity(self.read_buffer_size, file);
        self.split(reader, total, message_callback, progress_callback)
            .map_err(|e| match e {
                MimeboxError::Io { source, .. } => MimeboxError::io(path, source),
                other => other,
            })
    }

    /// Split any buffered stream. `total` is only used for progress reports.
    pub fn split<R: BufRead>(
        &self,
        mut reader: R,
        total: u64,
        message_callback: &mut dyn FnMut(u64, &[u8]) -> bool,
        progress_callback: Option<&dyn Fn(u64, u64)>,
    ) -> Result<u64> {
        const PROGRESS_INTERVAL: u64 = 4 * 1024 * 1024;

        let mut count: u64 = 0;
        let mut offset: u64 = 0;
        let mut message_start: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
        let mut prev_line_was_empty = true;
        let mut truncated = false;
        let mut last_progress: u64 = 0;

        loop {
            line_buf.clear();
            let line_len = reader.read_until(b'\n', &mut line_buf)? as u64;
            if line_len == 0 {
                break;
            }

            if is_mbox_separator(&line_buf) {
                if !prev_line_was_empty && offset > 0 {
                    warn!(
                        offset = offset,
                        "Found 'From ' separator without preceding blank line"
                    );
                }
                if !message_buf.is_empty() {
                    count += 1;
                    if !message_callback(message_start, &message_buf) {
                        return Ok(count);
                    }
                }
                message_start = offset;
                message_buf.clear();
                truncated = false;
                message_buf.extend_from_slice(&line_buf);
            } else if message_buf.len() + line_buf.len() <= self.max_message_size {
                message_buf.extend_from_slice(&line_buf);
            } else if !truncated {
                warn!(
                    offset = message_start,
                    max_size = self.max_message_size,
                    "Message exceeds maximum size, truncating"
                );
                truncated = true;
            }

            prev_line_was_empty = is_blank_line(&line_buf);
            offset += line_len;

            if let Some(cb) = progress_callback {
                if offset - last_progress >= PROGRESS_INTERVAL {
                    cb(offset, total);
                    last_progress = offset;
                }
            }
        }

        if !message_buf.is_empty() {
            count += 1;
            message_callback(message_start, &message_buf);
        }

        if let Some(cb) = progress_callback {
            cb(total.max(offset), total.max(offset));
        }

        Ok(count)
    }
}

/// Whether raw bytes look like an mbox rather than a single message.
pub fn looks_like_mbox(data: &[u8]) -> bool {
    is_mbox_separator(data)
}

/// Check whether a line is an mbox separator (`From ` at the start).
fn is_mbox_separator(line: &[u8]) -> bool {
    let line = line.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(line);
    line.starts_with(b"From ")
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
