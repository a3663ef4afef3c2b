//! Message parsing: framing, mbox splitting, header decoding, multipart
//! reading, transfer decoding, and MIME decomposition.

pub mod content_type;
pub mod disposition;
pub mod encoding;
pub mod header;
pub mod mbox;
pub mod message;
pub mod mime;
pub mod multipart;
