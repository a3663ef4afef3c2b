//! Load `.eml` and mbox files into a [`MailBox`].

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MimeboxError, Result};
use crate::model::MailId;
use crate::parser::mbox::{looks_like_mbox, MboxSplitter};
use crate::parser::message::RawMessage;
use crate::parser::mime::Decomposer;
use crate::store::MailBox;

/// What to do with a message that fails to decompose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop and return the error.
    #[default]
    Abort,
    /// Log the error, count the message as skipped, and continue.
    Skip,
}

/// Outcome of loading one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    /// Identifiers of the mails added, in input order.
    pub mail_ids: Vec<MailId>,
}

impl LoadReport {
    /// Fold another report into this one.
    pub fn merge(&mut self, other: LoadReport) {
        self.loaded += other.loaded;
        self.skipped += other.skipped;
        self.mail_ids.extend(other.mail_ids);
    }
}

/// Load `path` with the default mbox splitter.
pub fn load_path(
    store: &mut MailBox,
    decomposer: &Decomposer,
    path: &Path,
    policy: ErrorPolicy,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<LoadReport> {
    load_path_with(
        store,
        decomposer,
        &MboxSplitter::default(),
        path,
        policy,
        progress,
    )
}

/// Load `path`, treating it as an mbox when its first line is a `From `
/// separator and as a single message otherwise.
pub fn load_path_with(
    store: &mut MailBox,
    decomposer: &Decomposer,
    splitter: &MboxSplitter,
    path: &Path,
    policy: ErrorPolicy,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<LoadReport> {
    if is_mbox_file(path)? {
        info!(path = %path.display(), "Loading mbox");
        load_mbox(store, decomposer, splitter, path, policy, progress)
    } else {
        debug!(path = %path.display(), "Loading single message");
        let data = std::fs::read(path).map_err(|e| open_error(path, e))?;
        let mut report = LoadReport::default();
        add_message(store, decomposer, &data, policy, path, 0, &mut report)?;
        Ok(report)
    }
}

fn load_mbox(
    store: &mut MailBox,
    decomposer: &Decomposer,
    splitter: &MboxSplitter,
    path: &Path,
    policy: ErrorPolicy,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    let mut failure: Option<MimeboxError> = None;

    splitter.split_file(
        path,
        &mut |offset, bytes| {
            match add_message(store, decomposer, bytes, policy, path, offset, &mut report) {
                Ok(()) => true,
                Err(e) => {
                    failure = Some(e);
                    false
                }
            }
        },
        progress,
    )?;

    if let Some(e) = failure {
        return Err(e);
    }
    info!(
        path = %path.display(),
        loaded = report.loaded,
        skipped = report.skipped,
        "Finished loading mbox"
    );
    Ok(report)
}

/// Decompose one raw message, applying `policy` on failure.
fn add_message(
    store: &mut MailBox,
    decomposer: &Decomposer,
    bytes: &[u8],
    policy: ErrorPolicy,
    path: &Path,
    offset: u64,
    report: &mut LoadReport,
) -> Result<()> {
    let message = RawMessage::parse(bytes);
    match decomposer.decompose(store, &message) {
        Ok(id) => {
            report.loaded += 1;
            report.mail_ids.push(id);
            Ok(())
        }
        Err(e) if policy == ErrorPolicy::Skip => {
            warn!(
                path = %path.display(),
                offset = offset,
                structural = e.is_structural(),
                error = %e,
                "Skipping message that failed to decompose"
            );
            report.skipped += 1;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_mbox_file(path: &Path) -> Result<bool> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    let mut reader = BufReader::new(file);
    let head = reader.fill_buf().map_err(|e| MimeboxError::io(path, e))?;
    Ok(looks_like_mbox(head))
}

fn open_error(path: &Path, e: std::io::Error) -> MimeboxError {
    if e.kind() == std::io::ErrorKind::NotFound {
        MimeboxError::FileNotFound(path.to_path_buf())
    } else {
        MimeboxError::io(path, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const GOOD: &str = "Subject: ok\r\nContent-Type: text/plain\r\n\r\nfine\r\n";
    const BAD: &str = "Subject: broken\r\n\r\nno content type\r\n";

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn mbox(messages: &[&str]) -> String {
        messages
            .iter()
            .map(|m| format!("From sender@example.com Mon Jan  1 00:00:00 2024\n{m}\n"))
            .collect()
    }

    #[test]
    fn test_load_single_message() {
        let file = write_temp(GOOD);
        let mut store = MailBox::new();
        let report = load_path(
            &mut store,
            &Decomposer::default(),
            file.path(),
            ErrorPolicy::Abort,
            None,
        )
        .unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(report.mail_ids, vec![MailId(1)]);
        assert_eq!(store.mail_count(), 1);
    }

    #[test]
    fn test_load_mbox_in_order() {
        let file = write_temp(&mbox(&[GOOD, GOOD, GOOD]));
        let mut store = MailBox::new();
        let report = load_path(
            &mut store,
            &Decomposer::default(),
            file.path(),
            ErrorPolicy::Abort,
            None,
        )
        .unwrap();
        assert_eq!(report.loaded, 3);
        assert_eq!(report.mail_ids, vec![MailId(1), MailId(2), MailId(3)]);
        assert_eq!(store.content_count(), 3);
    }

    #[test]
    fn test_abort_stops_at_first_error() {
        let file = write_temp(&mbox(&[GOOD, BAD, GOOD]));
        let mut store = MailBox::new();
        let err = load_path(
            &mut store,
            &Decomposer::default(),
            file.path(),
            ErrorPolicy::Abort,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MimeboxError::MalformedHeader { .. }));
        assert_eq!(store.mail_count(), 1);
    }

    #[test]
    fn test_skip_continues_past_errors() {
        let file = write_temp(&mbox(&[GOOD, BAD, GOOD]));
        let mut store = MailBox::new();
        let report = load_path(
            &mut store,
            &Decomposer::default(),
            file.path(),
            ErrorPolicy::Skip,
            None,
        )
        .unwrap();
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.mail_ids, vec![MailId(1), MailId(2)]);
    }

    #[test]
    fn test_missing_file() {
        let mut store = MailBox::new();
        let err = load_path(
            &mut store,
            &Decomposer::default(),
            Path::new("/nonexistent/mail.eml"),
            ErrorPolicy::Abort,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MimeboxError::FileNotFound(_)));
    }

    #[test]
    fn test_report_merge() {
        let mut a = LoadReport {
            loaded: 1,
            skipped: 0,
            mail_ids: vec![MailId(1)],
        };
        a.merge(LoadReport {
            loaded: 1,
            skipped: 2,
            mail_ids: vec![MailId(2)],
        });
        assert_eq!(a.loaded, 2);
        assert_eq!(a.skipped, 2);
        assert_eq!(a.mail_ids, vec![MailId(1), MailId(2)]);
    }
}
