//! Decoded leaf parts.
//!
//! A [`Content`] is never a multipart container: containers are walked, only
//! their leaves are stored.

use super::mail::MailId;

/// Identifier of a [`Content`], unique within a mailbox and never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ContentId(pub u64);

impl ContentId {
    /// The identifier `n` positions after this one.
    pub fn offset(self, n: usize) -> Self {
        Self(self.0 + n as u64)
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a leaf part is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// The displayable message body outside any alternative container.
    Main,
    /// One rendering of the body inside `multipart/alternative`.
    Alt,
    /// Inline resource of a `multipart/related` container.
    Embedded,
    /// A part of a `multipart/mixed` container.
    Attachment,
}

impl ContentKind {
    /// Whether the part belongs in [`Mail::body`](super::mail::Mail::body).
    pub fn is_body(self) -> bool {
        matches!(self, Self::Main | Self::Alt)
    }

    /// Short label used in listings.
    pub fn label(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Alt => "alt",
            Self::Embedded => "embedded",
            Self::Attachment => "attachment",
        }
    }
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One decoded leaf part, fully materialized.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Content {
    /// Mailbox-scoped identifier.
    pub id: ContentId,

    /// The owning mail.
    pub mail_id: MailId,

    /// Transfer-decoded bytes. No charset conversion is applied.
    pub data: Vec<u8>,

    /// Verbatim `Content-Type` header value.
    pub content_type: String,

    /// Verbatim `Content-Transfer-Encoding` header value (may be empty).
    pub encoding: String,

    /// Classification tag.
    pub kind: ContentKind,

    /// Disposition type (`inline`, `attachment`); empty for body parts.
    pub layout: String,

    /// Content-ID for embedded parts, filename for attachments, empty otherwise.
    pub name: String,
}

impl Content {
    /// Lowercased `type/subtype` without parameters.
    pub fn media_type(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }

    /// Decoded size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(kind: ContentKind) -> Content {
        Content {
            id: ContentId(7),
            mail_id: MailId(1),
            data: b"hello".to_vec(),
            content_type: "Text/HTML; charset=utf-8".to_string(),
            encoding: String::new(),
            kind,
            layout: String::new(),
            name: String::new(),
        }
    }

    #[test]
    fn test_media_type_strips_parameters() {
        assert_eq!(sample(ContentKind::Alt).media_type(), "text/html");
    }

    #[test]
    fn test_body_kinds() {
        assert!(ContentKind::Main.is_body());
        assert!(ContentKind::Alt.is_body());
        assert!(!ContentKind::Embedded.is_body());
        assert!(!ContentKind::Attachment.is_body());
    }

    #[test]
    fn test_offset() {
        assert_eq!(ContentId(4).offset(3), ContentId(7));
        assert_eq!(sample(ContentKind::Main).size(), 5);
    }
}
