//! The content store and the driver that fills it.

pub mod loader;
pub mod mailbox;

pub use loader::{load_path, ErrorPolicy, LoadReport};
pub use mailbox::MailBox;
