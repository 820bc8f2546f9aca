//! Common types shared across Duet crates.
//!
//! This crate holds the error taxonomy every stage reports through and the
//! attachment handling that runs before any model is called.

pub mod attachment;
pub mod error;

pub use attachment::{Attachment, AttachmentPolicy};
pub use error::{DuetError, Result};
