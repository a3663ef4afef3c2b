//! MIME decomposition: walk a message's part tree, decode every leaf, and
//! record it in a [`MailBox`] as a typed [`Content`].
//!
//! The walk is depth-first and pre-order; siblings are visited in the order
//! they appear. Containers (`multipart/alternative`, `multipart/related`,
//! `multipart/mixed`) are never stored themselves. Every other media type,
//! including other `multipart/*` subtypes, is an opaque leaf.

use std::io::Read;

use tracing::debug;

use crate::config::DecomposeConfig;
use crate::error::{MimeboxError, Result};
use crate::model::{Content, ContentId, ContentKind, Mail, MailId};
use crate::parser::content_type::MediaType;
use crate::parser::disposition;
use crate::parser::encoding::{self, TransferEncoding};
use crate::parser::header::Headers;
use crate::parser::message::RawMessage;
use crate::parser::multipart::MultipartReader;
use crate::store::MailBox;

/// The kind of container a part sits in, as seen from the leaf.
///
/// Variants are ordered by precedence. Entering a container keeps whichever
/// of the current and the new context ranks higher, so a leaf inside both an
/// alternative and a related container is `Alternative` regardless of which
/// is outermost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ContainerContext {
    #[default]
    None,
    Mixed,
    Related,
    Alternative,
}

impl ContainerContext {
    /// The container a `multipart/*` media type opens, if it is one we descend into.
    pub fn for_media_type(media: &MediaType) -> Option<Self> {
        if !media.is_multipart() {
            return None;
        }
        match media.subtype.as_str() {
            "alternative" => Some(Self::Alternative),
            "related" => Some(Self::Related),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }

    /// Context for the children of `container`.
    pub fn enter(self, container: Self) -> Self {
        self.max(container)
    }

    /// How a leaf in this context is classified.
    pub fn leaf_kind(self) -> ContentKind {
        match self {
            Self::Alternative => ContentKind::Alt,
            Self::Related => ContentKind::Embedded,
            Self::Mixed => ContentKind::Attachment,
            Self::None => ContentKind::Main,
        }
    }
}

/// A mail being decomposed, with the contents found so far.
///
/// Nothing reaches the store until [`commit`](Self::commit), so a walk that
/// fails part-way leaves the store untouched.
#[derive(Debug)]
pub struct PendingMail {
    mail: Mail,
    first_content: ContentId,
    contents: Vec<Content>,
}

impl PendingMail {
    /// Start a mail whose identifiers follow the store's current contents.
    pub fn new(store: &MailBox, headers: &Headers) -> Self {
        Self {
            mail: Mail::new(store.next_mail_id(), headers.to_map()),
            first_content: store.next_content_id(),
            contents: Vec::new(),
        }
    }

    pub fn id(&self) -> MailId {
        self.mail.id
    }

    pub fn mail(&self) -> &Mail {
        &self.mail
    }

    /// Contents staged so far, in encounter order.
    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    fn next_content_id(&self) -> ContentId {
        self.first_content.offset(self.contents.len())
    }

    fn push(&mut self, content: Content) {
        match content.kind {
            kind if kind.is_body() => self.mail.body.push(content.id),
            ContentKind::Attachment => self.mail.attachments.push(content.id),
            _ => self.mail.embeds.push(content.id),
        }
        self.contents.push(content);
    }

    /// Write the mail and its contents to the store.
    ///
    /// If the store gained records since [`new`](Self::new), identifiers are
    /// shifted to the next free ones so nothing is overwritten.
    pub fn commit(mut self, store: &mut MailBox) -> MailId {
        let mail_id = store.next_mail_id();
        let first = store.next_content_id();
        if mail_id != self.mail.id || first != self.first_content {
            self.renumber(mail_id, first);
        }

        for content in self.contents {
            store.put_content(content);
        }
        store.put_mail(self.mail);
        mail_id
    }

    fn renumber(&mut self, mail_id: MailId, first: ContentId) {
        let old_first = self.first_content.0;
        let shift = |id: &mut ContentId| *id = first.offset((id.0 - old_first) as usize);

        self.mail.id = mail_id;
        self.mail.body.iter_mut().for_each(shift);
        self.mail.attachments.iter_mut().for_each(shift);
        self.mail.embeds.iter_mut().for_each(shift);
        for content in &mut self.contents {
            shift(&mut content.id);
            content.mail_id = mail_id;
        }
        self.first_content = first;
    }
}

/// Classifies and decodes MIME parts.
#[derive(Debug, Clone, Default)]
pub struct Decomposer {
    config: DecomposeConfig,
}

impl Decomposer {
    pub fn new(config: DecomposeConfig) -> Self {
        Self { config }
    }

    /// Decompose one framed message into `store`, returning the new mail's id.
    ///
    /// On error the store is left unchanged.
    pub fn decompose(&self, store: &mut MailBox, message: &RawMessage) -> Result<MailId> {
        let mut pending = PendingMail::new(store, &message.headers);
        self.process(
            message.body.as_slice(),
            &message.headers,
            &mut pending,
            ContainerContext::None,
            0,
        )?;

        debug!(
            mail_id = %pending.id(),
            contents = pending.contents().len(),
            body = pending.mail().body.len(),
            attachments = pending.mail().attachments.len(),
            embeds = pending.mail().embeds.len(),
            "Decomposed message"
        );
        Ok(pending.commit(store))
    }

    /// Process one part: recurse into containers, decode and classify leaves.
    ///
    /// `depth` is the number of containers above this part.
    pub fn process<R: Read>(
        &self,
        mut body: R,
        headers: &Headers,
        pending: &mut PendingMail,
        context: ContainerContext,
        depth: usize,
    ) -> Result<()> {
        let content_type = self.content_type(headers)?;
        let media = parse_media_type(&content_type)?;

        let Some(container) = ContainerContext::for_media_type(&media) else {
            return self.process_leaf(body, headers, content_type, &media, pending, context);
        };

        if depth >= self.config.max_depth {
            return Err(MimeboxError::NestingTooDeep {
                depth: self.config.max_depth,
            });
        }
        let boundary = media
            .boundary
            .as_deref()
            .ok_or_else(|| MimeboxError::malformed("Content-Type", "missing boundary parameter"))?;

        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;

        let children = context.enter(container);
        let mut reader = MultipartReader::new(&buf, boundary);
        while let Some(part) = reader.next_part()? {
            self.process(part.body, &part.headers, pending, children, depth + 1)?;
        }
        Ok(())
    }

    fn process_leaf<R: Read>(
        &self,
        mut body: R,
        headers: &Headers,
        content_type: String,
        media: &MediaType,
        pending: &mut PendingMail,
        context: ContainerContext,
    ) -> Result<()> {
        let mut raw = Vec::new();
        body.read_to_end(&mut raw)?;

        let encoding = headers.get_or_empty("Content-Transfer-Encoding");
        let data = encoding::decode(
            &raw,
            TransferEncoding::from_header(encoding),
            self.config.quoted_printable,
        )?;

        let kind = context.leaf_kind();
        let disposition = headers.get_or_empty("Content-Disposition");
        let (layout, name) = match kind {
            ContentKind::Embedded => (
                disposition::layout(disposition).to_string(),
                disposition::content_id(headers.get_or_empty("Content-ID")).to_string(),
            ),
            ContentKind::Attachment => (
                disposition::layout(disposition).to_string(),
                disposition::filename(disposition)
                    .or_else(|| media.name.clone())
                    .unwrap_or_default(),
            ),
            ContentKind::Main | ContentKind::Alt => (String::new(), String::new()),
        };

        let content = Content {
            id: pending.next_content_id(),
            mail_id: pending.id(),
            data,
            content_type,
            encoding: encoding.to_string(),
            kind,
            layout,
            name,
        };
        debug!(
            mail_id = %content.mail_id,
            content_id = %content.id,
            kind = %content.kind,
            media_type = %media.essence(),
            size = content.data.len(),
            "Classified leaf part"
        );
        pending.push(content);
        Ok(())
    }

    /// The part's `Content-Type`, or the configured default when absent.
    fn content_type(&self, headers: &Headers) -> Result<String> {
        match headers.get("Content-Type") {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            _ => self
                .config
                .default_content_type
                .clone()
                .ok_or_else(|| MimeboxError::malformed("Content-Type", "header is missing")),
        }
    }
}

/// Parse a `Content-Type` value into a media type and its parameters.
fn parse_media_type(value: &str) -> Result<MediaType> {
    MediaType::parse(value).ok_or_else(|| {
        MimeboxError::malformed("Content-Type", format!("'{value}' is not a type/subtype"))
    })
}
