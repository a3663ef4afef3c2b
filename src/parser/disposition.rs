//! `Content-Disposition` and related parameter lookups.

use mail_parser::{MessageParser, MimeHeaders};

/// The disposition type: the first `;`-delimited segment, trimmed.
///
/// `"attachment; filename=a.pdf"` → `"attachment"`. Empty when the header is absent.
pub fn layout(value: &str) -> &str {
    value.split(';').next().unwrap_or("").trim()
}

/// The `filename` parameter of a disposition header value.
///
/// Parameters are looked up by name, so their order and any extra
/// parameters (`size`, `creation-date`) do not matter. RFC 2231 encoded
/// and continued values are resolved by `mail-parser`.
pub fn filename(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return None;
    }
    parsed_parameter(value, "filename")
        .or_else(|| scan_parameter(value, "filename"))
}

/// Let `mail-parser` parse the header inside a minimal message.
fn parsed_parameter(value: &str, parameter: &str) -> Option<String> {
    let fake_msg = format!("Content-Disposition: {value}\r\n\r\n");
    let parser = MessageParser::default();
    let message = parser.parse(fake_msg.as_bytes())?;
    message
        .root_part()
        .content_disposition()?
        .attribute(parameter)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Plain `;`-separated `name=value` scan, used when the header cannot be parsed.
fn scan_parameter(value: &str, parameter: &str) -> Option<String> {
    value.split(';').skip(1).find_map(|segment| {
        let (name, raw) = segment.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case(parameter) {
            return None;
        }
        let raw = raw.trim();
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .unwrap_or(raw);
        (!unquoted.is_empty()).then(|| unquoted.to_string())
    })
}

/// Strip one leading `<` and one trailing `>` from a `Content-ID` value.
pub fn content_id(value: &str) -> &str {
    let value = value.trim();
    let value = value.strip_prefix('<').unwrap_or(value);
    value.strip_suffix('>').unwrap_or(value)
}
