//! `Content-Type` parsing.
//!
//! Values go through `mail-parser`, which tolerates whitespace around `=`,
//! unquoted parameters and RFC 2231 continuations (`boundary*0=`).

use mail_parser::{MessageParser, MimeHeaders};

/// A parsed `type/subtype` with the parameters the decomposer reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// Lowercased top-level type, e.g. `multipart`.
    pub type_: String,
    /// Lowercased subtype, e.g. `alternative`.
    pub subtype: String,
    pub boundary: Option<String>,
    /// Legacy `name` parameter, used as an attachment filename fallback.
    pub name: Option<String>,
}

impl MediaType {
    /// Parse a header value. `None` when there is no `type/subtype` pair.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().trim_end_matches(';').trim();
        if value.is_empty() {
            return None;
        }

        let fake_msg = format!("Content-Type: {value}\r\n\r\n");
        let parser = MessageParser::default();
        let message = parser.parse(fake_msg.as_bytes())?;
        let parsed = message.root_part().content_type()?;

        let type_ = token(parsed.ctype())?;
        let subtype = token(parsed.subtype()?)?;
        Some(Self {
            type_,
            subtype,
            boundary: parameter(parsed.attribute("boundary")),
            name: parameter(parsed.attribute("name")),
        })
    }

    pub fn is_multipart(&self) -> bool {
        self.type_ == "multipart"
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }
}

fn token(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let valid = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, '/' | ';' | '=' | '"'));
    valid.then(|| raw.to_ascii_lowercase())
}

fn parameter(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
