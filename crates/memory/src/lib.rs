//! Conversation memory for Duet sessions.
//!
//! Each session owns one [`MemoryBuffer`]: a fixed-capacity log of prior
//! turns that is rendered into a text block and prepended to the next
//! drafting request.
//!
//! ```text
//!   append ──► [ oldest | ... | newest ] ──► format_for_prompt
//!                  ▲
//!                  └── evicted first once len > capacity
//! ```

pub mod store;
pub mod types;

pub use store::MemoryBuffer;
pub use types::{MemoryConfig, MemoryEntry, Speaker};
