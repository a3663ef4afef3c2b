//! Write decoded attachment and embedded contents to disk.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{MimeboxError, Result};
use crate::model::{Content, ContentKind, MailId};
use crate::store::MailBox;

/// Maximum length of a sanitized file name component.
const MAX_NAME_LEN: usize = 150;

/// Which contents to export.
#[derive(Debug, Clone, Copy)]
pub struct ExportFilter {
    pub include_embedded: bool,
}

impl Default for ExportFilter {
    fn default() -> Self {
        Self {
            include_embedded: true,
        }
    }
}

impl ExportFilter {
    fn accepts(&self, content: &Content) -> bool {
        match content.kind {
            ContentKind::Attachment => true,
            ContentKind::Embedded => self.include_embedded,
            ContentKind::Main | ContentKind::Alt => false,
        }
    }
}

/// Export the attachments (and embeds, per `filter`) of `mails`.
///
/// Files land in `{output_dir}/mail-{id}/`; mails with nothing to export get
/// no folder. Returns the written paths in store order.
pub fn export_contents(
    store: &MailBox,
    mails: &[MailId],
    output_dir: &Path,
    filter: ExportFilter,
    progress: &dyn Fn(usize, usize),
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).map_err(|e| MimeboxError::io(output_dir, e))?;
    let mut all_paths = Vec::new();
    let total = mails.len();

    for (i, &mail_id) in mails.iter().enumerate() {
        progress(i, total);

        let mail = store
            .mail(mail_id)
            .ok_or_else(|| MimeboxError::ExportError(format!("mail {mail_id} is not in the store")))?;
        let selected: Vec<&Content> = mail
            .content_ids()
            .filter_map(|id| store.content(id))
            .filter(|c| filter.accepts(c))
            .collect();
        if selected.is_empty() {
            continue;
        }

        let folder = output_dir.join(format!("mail-{mail_id}"));
        std::fs::create_dir_all(&folder).map_err(|e| MimeboxError::io(&folder, e))?;

        for content in selected {
            let path = unique_path(&folder.join(file_name(content)));
            std::fs::write(&path, &content.data).map_err(|e| MimeboxError::io(&path, e))?;
            debug!(
                content_id = %content.id,
                path = %path.display(),
                size = content.data.len(),
                "Exported content"
            );
            all_paths.push(path);
        }
    }
    progress(total, total);

    if all_paths.is_empty() {
        warn!(output = %output_dir.display(), "No attachments or embedded parts to export");
    }
    Ok(all_paths)
}

/// File name for a content: its sanitized name, or `content-{id}.bin`.
pub fn file_name(content: &Content) -> String {
    if content.name.trim().is_empty() {
        format!("content-{}.bin", content.id)
    } else {
        sanitize_filename_part(&content.name, MAX_NAME_LEN)
    }
}

/// Replace characters that are unsafe in file names with `_`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    // A bare "." or ".." would escape the mail folder
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "unknown".to_string()
    } else {
        sanitized
    }
}

/// If `path` already exists, append a counter to make it unique.
fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    let mut i = 1;
    loop {
        let candidate = if ext.is_empty() {
            parent.join(format!("{stem}_{i}"))
        } else {
            parent.join(format!("{stem}_{i}.{ext}"))
        };
        if !candidate.exists() {
            return candidate;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentId, Mail};
    use std::collections::BTreeMap;

    fn content(id: u64, mail: u64, kind: ContentKind, name: &str, data: &[u8]) -> Content {
        Content {
            id: ContentId(id),
            mail_id: MailId(mail),
            data: data.to_vec(),
            content_type: "application/octet-stream".to_string(),
            encoding: "base64".to_string(),
            kind,
            layout: String::new(),
            name: name.to_string(),
        }
    }

    fn store_with(contents: Vec<Content>) -> MailBox {
        let mut store = MailBox::new();
        let mut mail = Mail::new(MailId(1), BTreeMap::new());
        for c in contents {
            match c.kind {
                ContentKind::Main | ContentKind::Alt => mail.body.push(c.id),
                ContentKind::Attachment => mail.attachments.push(c.id),
                ContentKind::Embedded => mail.embeds.push(c.id),
            }
            store.put_content(c);
        }
        store.put_mail(mail);
        store
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename_part("report.pdf", 50), "report.pdf");
        assert_eq!(sanitize_filename_part("../../etc/passwd", 50), ".._.._etc_passwd");
        assert_eq!(sanitize_filename_part("..", 50), "unknown");
        assert_eq!(sanitize_filename_part("", 50), "unknown");
        assert_eq!(sanitize_filename_part("abcdef", 3), "abc");
    }

    #[test]
    fn test_file_name_for_unnamed_content() {
        let c = content(7, 1, ContentKind::Attachment, "", b"x");
        assert_eq!(file_name(&c), "content-7.bin");
    }

    #[test]
    fn test_export_filters_and_dedups() {
        let store = store_with(vec![
            content(1, 1, ContentKind::Main, "", b"body"),
            content(2, 1, ContentKind::Attachment, "a.txt", b"first"),
            content(3, 1, ContentKind::Attachment, "a.txt", b"second"),
            content(4, 1, ContentKind::Embedded, "img@x", b"png"),
        ]);
        let dir = tempfile::tempdir().unwrap();

        let paths = export_contents(
            &store,
            &[MailId(1)],
            dir.path(),
            ExportFilter {
                include_embedded: false,
            },
            &|_, _| {},
        )
        .unwrap();

        let folder = dir.path().join("mail-1");
        assert_eq!(paths, vec![folder.join("a.txt"), folder.join("a_1.txt")]);
        assert_eq!(std::fs::read(folder.join("a.txt")).unwrap(), b"first");
        assert_eq!(std::fs::read(folder.join("a_1.txt")).unwrap(), b"second");
    }

    #[test]
    fn test_export_includes_embedded() {
        let store = store_with(vec![content(4, 1, ContentKind::Embedded, "img@x", b"png")]);
        let dir = tempfile::tempdir().unwrap();
        let paths = export_contents(
            &store,
            &[MailId(1)],
            dir.path(),
            ExportFilter::default(),
            &|_, _| {},
        )
        .unwrap();
        assert_eq!(paths, vec![dir.path().join("mail-1").join("img@x")]);
    }

    #[test]
    fn test_export_unknown_mail() {
        let store = MailBox::new();
        let dir = tempfile::tempdir().unwrap();
        let err = export_contents(
            &store,
            &[MailId(9)],
            dir.path(),
            ExportFilter::default(),
            &|_, _| {},
        )
        .unwrap_err();
        assert!(matches!(err, MimeboxError::ExportError(_)));
    }
}
