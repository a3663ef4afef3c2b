//! Mail records and their identifiers.

use std::collections::BTreeMap;

use super::content::ContentId;

/// Identifier of a [`Mail`], unique within a mailbox (sequential, 1-based).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct MailId(pub u64);

impl std::fmt::Display for MailId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One email message after decomposition.
///
/// The decoded parts live in the mailbox's content map; the mail only keeps
/// their identifiers, grouped by how they should be presented.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Mail {
    /// Mailbox-scoped identifier.
    pub id: MailId,

    /// Top-level headers keyed by canonical name (`Content-Type`), values in
    /// the order they appeared. Repeated headers keep every value.
    pub headers: BTreeMap<String, Vec<String>>,

    /// Main and alternative body parts, in encounter order.
    pub body: Vec<ContentId>,

    /// Attachment parts, in encounter order.
    pub attachments: Vec<ContentId>,

    /// Inline embedded resources, in encounter order.
    pub embeds: Vec<ContentId>,
}

impl Mail {
    /// Create an empty mail with the given identifier and headers.
    pub fn new(id: MailId, headers: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            id,
            headers,
            ..Self::default()
        }
    }

    /// First value of a header (name matched case-insensitively).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }

    /// Every content identifier owned by this mail, in body, attachment, embed order.
    pub fn content_ids(&self) -> impl Iterator<Item = ContentId> + '_ {
        self.body
            .iter()
            .chain(&self.attachments)
            .chain(&self.embeds)
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut headers = BTreeMap::new();
        headers.insert("Subject".to_string(), vec!["Hi".to_string()]);
        let mail = Mail::new(MailId(3), headers);
        assert_eq!(mail.header("subject"), Some("Hi"));
        assert_eq!(mail.header("From"), None);
    }

    #[test]
    fn test_content_ids_order() {
        let mut mail = Mail::new(MailId(1), BTreeMap::new());
        mail.body = vec![ContentId(1), ContentId(2)];
        mail.attachments = vec![ContentId(4)];
        mail.embeds = vec![ContentId(3)];
        let ids: Vec<u64> = mail.content_ids().map(|c| c.0).collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
    }
}
