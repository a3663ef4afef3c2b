//! Core data model: mails and their decoded content records.

pub mod content;
pub mod mail;

pub use content::{Content, ContentId, ContentKind};
pub use mail::{Mail, MailId};
