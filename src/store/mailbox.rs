//! In-memory content store for one processing session.

use std::collections::BTreeMap;

use crate::model::{Content, ContentId, ContentKind, Mail, MailId};

/// All [`Mail`] and [`Content`] records decomposed during one session.
///
/// Identifiers are allocated as `count + 1`, so they stay sequential as long
/// as records are only ever added. The store has no delete operation.
///
/// Not synchronized: callers that decompose in parallel must serialize
/// allocation and insertion themselves.
#[derive(Debug, Default, Clone)]
pub struct MailBox {
    mails: BTreeMap<MailId, Mail>,
    contents: BTreeMap<ContentId, Content>,
}

impl MailBox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier the next inserted mail should take.
    pub fn next_mail_id(&self) -> MailId {
        MailId(self.mails.len() as u64 + 1)
    }

    /// Identifier the next inserted content should take.
    pub fn next_content_id(&self) -> ContentId {
        ContentId(self.contents.len() as u64 + 1)
    }

    /// Insert a mail, returning the record it replaced, if any.
    pub fn put_mail(&mut self, mail: Mail) -> Option<Mail> {
        self.mails.insert(mail.id, mail)
    }

    /// Insert a content record, returning the record it replaced, if any.
    pub fn put_content(&mut self, content: Content) -> Option<Content> {
        self.contents.insert(content.id, content)
    }

    /// Look up a mail.
    pub fn mail(&self, id: MailId) -> Option<&Mail> {
        self.mails.get(&id)
    }

    /// Look up a content record.
    pub fn content(&self, id: ContentId) -> Option<&Content> {
        self.contents.get(&id)
    }

    /// All content records in identifier order.
    pub fn contents(&self) -> impl Iterator<Item = &Content> {
        self.contents.values()
    }

    /// Content records owned by one mail, in identifier order.
    pub fn contents_of(&self, mail_id: MailId) -> impl Iterator<Item = &Content> {
        self.contents.values().filter(move |c| c.mail_id == mail_id)
    }

    /// Content records of one mail with the given classification.
    pub fn contents_of_kind(
        &self,
        mail_id: MailId,
        kind: ContentKind,
    ) -> impl Iterator<Item = &Content> {
        self.contents_of(mail_id).filter(move |c| c.kind == kind)
    }

    /// Number of stored mails.
    pub fn mail_count(&self) -> usize {
        self.mails.len()
    }

    /// Number of stored content records.
    pub fn content_count(&self) -> usize {
        self.contents.len()
    }

    /// Total decoded bytes held by the store.
    pub fn total_size(&self) -> u64 {
        self.contents.values().map(Content::size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(id: u64, mail: u64, kind: ContentKind) -> Content {
        Content {
            id: ContentId(id),
            mail_id: MailId(mail),
            data: vec![0; id as usize],
            content_type: "text/plain".to_string(),
            encoding: String::new(),
            kind,
            layout: String::new(),
            name: String::new(),
        }
    }

    #[test]
    fn test_ids_start_at_one() {
        let store = MailBox::new();
        assert_eq!(store.next_mail_id(), MailId(1));
        assert_eq!(store.next_content_id(), ContentId(1));
    }

    #[test]
    fn test_ids_follow_count() {
        let mut store = MailBox::new();
        store.put_mail(Mail::new(MailId(1), BTreeMap::new()));
        store.put_content(content(1, 1, ContentKind::Main));
        store.put_content(content(2, 1, ContentKind::Attachment));
        assert_eq!(store.next_mail_id(), MailId(2));
        assert_eq!(store.next_content_id(), ContentId(3));
        assert_eq!(store.total_size(), 3);
    }

    #[test]
    fn test_put_overwrites_same_id() {
        let mut store = MailBox::new();
        assert!(store.put_content(content(1, 1, ContentKind::Main)).is_none());
        let replaced = store.put_content(content(1, 1, ContentKind::Alt));
        assert_eq!(replaced.map(|c| c.kind), Some(ContentKind::Main));
        assert_eq!(store.content_count(), 1);
    }

    #[test]
    fn test_contents_of_filters_by_mail_and_kind() {
        let mut store = MailBox::new();
        store.put_content(content(1, 1, ContentKind::Main));
        store.put_content(content(2, 2, ContentKind::Main));
        store.put_content(content(3, 1, ContentKind::Attachment));
        assert_eq!(store.contents_of(MailId(1)).count(), 2);
        let atts: Vec<_> = store
            .contents_of_kind(MailId(1), ContentKind::Attachment)
            .map(|c| c.id)
            .collect();
        assert_eq!(atts, vec![ContentId(3)]);
    }
}
