//! Parsed markup trees
//!
//! Driver-independent tag tree for offline text and structure analysis.
//!
//! ## Core Design
//!
//! ```text
//! markup → MarkupParser → TagArena (Vec<ParsedTag>, index = source order)
//!                              ↓
//!              ParsedDocumentTree ── TagQuery (descriptor) ──→ &ParsedTag
//!                              ↓
//!                       TextSerializer → prose
//! ```
//!
//! Nodes refer to each other by `NodeId` (u32). Parent/children give the
//! nesting; the arena order gives previous/next in the source.

pub mod arena;
pub mod document;
pub mod error;
pub mod parser;
pub mod query;
pub mod serializer;
pub mod types;
pub mod utils;

pub use arena::TagArena;
pub use document::ParsedDocumentTree;
pub use error::{DomError, Result};
pub use parser::ParserConfig;
pub use query::TagQuery;
pub use serializer::TextSerializer;
pub use types::*;
