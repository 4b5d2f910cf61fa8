//! Core type definitions for the parsed markup tree
//!
//! Key design principles:
//! 1. Use u32 for indices (4 bytes vs 8 bytes pointer)
//! 2. Arena index order IS document order, so "next in document" is `id + 1`
//! 3. Use SmallVec for child lists (most tags have few children)
//! 4. The source text is stored once; nodes keep a byte span into it

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Node identifier (index into arena)
pub type NodeId = u32;

/// Id of the synthetic document node every tree starts with
pub const ROOT_ID: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
}

/// How an element ended in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagStatus {
    /// Start tag never matched by an end tag
    Open,
    /// Start tag matched by an explicit end tag
    Closed,
    /// Void element, `<x/>`, or a non-element node
    Single,
}

/// Shared handle to the markup a tree was parsed from
#[derive(Clone)]
pub struct SourceText(Arc<str>);

impl SourceText {
    pub fn new(text: &str) -> Self {
        Self(Arc::from(text))
    }

    /// Text covered by `span`; empty if the span does not fit
    pub fn slice(&self, span: &Range<usize>) -> &str {
        self.0.get(span.clone()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SourceText {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceText({} bytes)", self.0.len())
    }
}

/// One node of the parsed tree
///
/// Serialization carries structure and span only, not the source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTag {
    pub node_id: NodeId,
    pub kind: NodeKind,

    /// Lower-cased tag name; `#document`, `#text` or `#comment` otherwise
    pub tag_name: String,
    pub status: TagStatus,

    /// Byte range of the node in the source: start tag through end tag for
    /// closed elements
    pub span: Range<usize>,
    #[serde(skip)]
    source: SourceText,
    /// 1-based line of the node's first character
    pub source_line: u32,

    /// Lower-cased attribute names → entity-decoded values, in source order
    pub attributes: Vec<(String, String)>,

    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>,
}

impl ParsedTag {
    pub fn new(node_id: NodeId, kind: NodeKind, tag_name: String, source_line: u32) -> Self {
        Self {
            node_id,
            kind,
            tag_name,
            status: TagStatus::Single,
            span: 0..0,
            source: SourceText::default(),
            source_line,
            attributes: Vec::new(),
            parent_id: None,
            children_ids: SmallVec::new(),
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// Point the node at `span` of `source`
    pub fn set_markup(&mut self, source: &SourceText, span: Range<usize>) {
        self.source = source.clone();
        self.span = span;
    }

    /// Source text of the node
    pub fn raw_markup(&self) -> &str {
        self.source.slice(&self.span)
    }

    /// Attribute value, name compared case-insensitively
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_children(&self) -> bool {
        !self.children_ids.is_empty()
    }
}

/// Elements that never have content or an end tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements whose body is text, never markup
pub const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements whose body is never rendered as prose
pub const NON_RENDERED_ELEMENTS: &[&str] = &["script", "style", "head", "template"];
