//! `mimebox` — decompose MIME messages into a store of typed contents.
//!
//! Each message becomes a [`model::Mail`] whose leaf parts are decoded and
//! recorded as [`model::Content`] values: body text (main or alternative
//! renderings), attachments, and embedded inline resources.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod store;
