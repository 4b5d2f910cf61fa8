//! Declarative element selectors
//!
//! ```text
//! SelectorDescriptor ──compile──▶ QueryExpression (CSS)
//!        │
//!        └── grouped by tag in SelectorDescriptorSet
//! ```
//!
//! Descriptors are plain data. Resolving them against a live page lives in
//! the `browser` crate; querying a parsed snapshot lives in `dom`.

pub mod compiler;
pub mod descriptor;
pub mod error;
pub mod set;

pub use compiler::{compile, compile_bare, requires_post_filter, QueryExpression};
pub use descriptor::{AttributeKind, MatchMode, PostFilter, SelectorDescriptor, TagName};
pub use error::{Result, SelectorError};
pub use set::SelectorDescriptorSet;
