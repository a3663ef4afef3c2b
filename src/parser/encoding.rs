//! Content-Transfer-Encoding decoding for leaf parts.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{MimeboxError, Result};

/// Transfer encodings a leaf may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    QuotedPrintable,
    Base64,
    /// Unrecognized token; the payload is passed through.
    Other,
}

impl TransferEncoding {
    /// Parse a header value case-insensitively. An empty value means 7bit.
    pub fn from_header(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("7bit") {
            Self::SevenBit
        } else if value.eq_ignore_ascii_case("8bit") {
            Self::EightBit
        } else if value.eq_ignore_ascii_case("binary") {
            Self::Binary
        } else if value.eq_ignore_ascii_case("quoted-printable") {
            Self::QuotedPrintable
        } else if value.eq_ignore_ascii_case("base64") {
            Self::Base64
        } else {
            Self::Other
        }
    }
}

/// How strictly quoted-printable input is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotedPrintableMode {
    /// Tolerate malformed escapes and long lines, as most mail readers do.
    #[default]
    Robust,
    /// Reject malformed input with a decode failure.
    Strict,
}

impl From<QuotedPrintableMode> for quoted_printable::ParseMode {
    fn from(mode: QuotedPrintableMode) -> Self {
        match mode {
            QuotedPrintableMode::Robust => quoted_printable::ParseMode::Robust,
            QuotedPrintableMode::Strict => quoted_printable::ParseMode::Strict,
        }
    }
}

/// Decode a leaf payload according to its transfer encoding.
pub fn decode(
    raw: &[u8],
    encoding: TransferEncoding,
    qp_mode: QuotedPrintableMode,
) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Base64 => decode_base64(raw),
        TransferEncoding::QuotedPrintable => quoted_printable::decode(raw, qp_mode.into())
            .map_err(|e| MimeboxError::DecodeFailure {
                encoding: "quoted-printable".to_string(),
                reason: e.to_string(),
            }),
        TransferEncoding::SevenBit
        | TransferEncoding::EightBit
        | TransferEncoding::Binary
        | TransferEncoding::Other => Ok(raw.to_vec()),
    }
}

/// Standard alphabet with padding; non-zero bits after the final symbol are ignored.
const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Standard base64 with line breaks and other whitespace ignored.
fn decode_base64(raw: &[u8]) -> Result<Vec<u8>> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    BASE64
        .decode(&compact)
        .map_err(|e| MimeboxError::DecodeFailure {
            encoding: "base64".to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_header() {
        assert_eq!(TransferEncoding::from_header("BASE64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::from_header(" Quoted-Printable "),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::from_header("7Bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::from_header(""), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::from_header("x-uuencode"), TransferEncoding::Other);
    }

    #[test]
    fn test_base64_with_line_breaks() {
        let raw = b"aGVsbG8g\r\nd29ybGQ=\r\n";
        let decoded = decode(raw, TransferEncoding::Base64, QuotedPrintableMode::Robust).unwrap();
        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn test_base64_round_trip() {
        let original: Vec<u8> = (0u8..=255).collect();
        let encoded = BASE64.encode(&original);
        let wrapped: Vec<u8> = encoded
            .as_bytes()
            .chunks(76)
            .flat_map(|line| line.iter().copied().chain(*b"\r\n"))
            .collect();
        let decoded =
            decode(&wrapped, TransferEncoding::Base64, QuotedPrintableMode::Robust).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_base64_tolerates_trailing_bits() {
        let decoded = decode(b"aGVsbG9=", TransferEncoding::Base64, QuotedPrintableMode::Robust)
            .unwrap();
        assert_eq!(decoded, b"hello");
    }

    #[test]
    fn test_invalid_base64_is_decode_failure() {
        let err = decode(b"***not base64***", TransferEncoding::Base64, QuotedPrintableMode::Robust)
            .unwrap_err();
        assert!(matches!(err, MimeboxError::DecodeFailure { ref encoding, .. } if encoding == "base64"));
    }

    #[test]
    fn test_quoted_printable() {
        let decoded = decode(
            b"caf=C3=A9 au lait",
            TransferEncoding::QuotedPrintable,
            QuotedPrintableMode::Robust,
        )
        .unwrap();
        assert_eq!(decoded, "café au lait".as_bytes());
    }

    #[test]
    fn test_quoted_printable_round_trip() {
        let original = "naïve = café".as_bytes();
        let encoded = quoted_printable::encode(original);
        let decoded = decode(
            &encoded,
            TransferEncoding::QuotedPrintable,
            QuotedPrintableMode::Robust,
        )
        .unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_strict_quoted_printable_rejects_bad_escape() {
        let err = decode(
            b"bad =ZZ escape",
            TransferEncoding::QuotedPrintable,
            QuotedPrintableMode::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, MimeboxError::DecodeFailure { .. }));
    }

    #[test]
    fn test_passthrough_encodings() {
        let raw = b"=3D stays literal\r\n";
        for enc in [
            TransferEncoding::SevenBit,
            TransferEncoding::EightBit,
            TransferEncoding::Binary,
            TransferEncoding::Other,
        ] {
            assert_eq!(decode(raw, enc, QuotedPrintableMode::Robust).unwrap(), raw);
        }
    }
}
