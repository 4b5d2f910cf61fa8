//! Parsed document tree - main entry point for offline queries
//!
//! Built once from a markup snapshot, read-only afterwards. Answers the same
//! descriptors the live resolver does, without a browser:
//!
//! - `first_tag` / `search` walk children depth-first (scoped)
//! - `next_tag` / `previous_tag` walk source order (global, never scoped)

use crate::arena::TagArena;
use crate::error::Result;
use crate::parser::{MarkupParser, ParserConfig};
use crate::query::TagQuery;
use crate::serializer::TextSerializer;
use crate::types::*;
use selector::SelectorDescriptor;

#[derive(Debug, Clone)]
pub struct ParsedDocumentTree {
    arena: TagArena,
    serializer: TextSerializer,
}

impl ParsedDocumentTree {
    /// Parse markup with the default parser configuration
    pub fn build(markup: &str) -> Self {
        Self::build_with_config(markup, &ParserConfig::default())
    }

    pub fn build_with_config(markup: &str, config: &ParserConfig) -> Self {
        Self {
            arena: MarkupParser::new(config, markup).parse(),
            serializer: TextSerializer::new(),
        }
    }

    pub fn arena(&self) -> &TagArena {
        &self.arena
    }

    /// The synthetic document node
    pub fn root(&self) -> &ParsedTag {
        self.arena.root()
    }

    pub fn get(&self, node_id: NodeId) -> Result<&ParsedTag> {
        self.arena.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn parent(&self, node_id: NodeId) -> Option<&ParsedTag> {
        self.arena.parent(node_id).ok().flatten()
    }

    pub fn children(&self, node_id: NodeId) -> Vec<&ParsedTag> {
        self.arena.children(node_id).unwrap_or_default()
    }

    /// Next node in source order, at any depth
    pub fn next(&self, node_id: NodeId) -> Option<&ParsedTag> {
        self.arena.next(node_id)
    }

    /// Previous node in source order, at any depth
    pub fn previous(&self, node_id: NodeId) -> Option<&ParsedTag> {
        self.arena.previous(node_id)
    }

    /// First element matching `descriptor`, depth-first from the document
    pub fn first_tag(&self, descriptor: &SelectorDescriptor) -> Option<&ParsedTag> {
        self.first_tag_within(ROOT_ID, descriptor)
    }

    /// First descendant of `scope` matching `descriptor`
    pub fn first_tag_within(
        &self,
        scope: NodeId,
        descriptor: &SelectorDescriptor,
    ) -> Option<&ParsedTag> {
        self.find_first(scope, &TagQuery::from_descriptor(descriptor))
    }

    /// Next matching element after `from` in source order
    ///
    /// Unlike `first_tag_within`, this is not limited to `from`'s subtree:
    /// nesting depth is irrelevant, only source position counts.
    pub fn next_tag(&self, from: NodeId, descriptor: &SelectorDescriptor) -> Option<&ParsedTag> {
        self.find_next(from, &TagQuery::from_descriptor(descriptor))
    }

    /// Nearest matching element before `from` in source order
    pub fn previous_tag(
        &self,
        from: NodeId,
        descriptor: &SelectorDescriptor,
    ) -> Option<&ParsedTag> {
        self.find_previous(from, &TagQuery::from_descriptor(descriptor))
    }

    /// Every element matching `descriptor`, depth-first pre-order
    pub fn search(&self, descriptor: &SelectorDescriptor) -> Vec<&ParsedTag> {
        self.search_within(ROOT_ID, descriptor)
    }

    pub fn search_within(&self, scope: NodeId, descriptor: &SelectorDescriptor) -> Vec<&ParsedTag> {
        self.find_all(scope, &TagQuery::from_descriptor(descriptor))
    }

    /// Whether any descendant of `scope` matches `descriptor`
    pub fn child_exists(&self, scope: NodeId, descriptor: &SelectorDescriptor) -> bool {
        self.first_tag_within(scope, descriptor).is_some()
    }

    pub fn find_first(&self, scope: NodeId, query: &TagQuery) -> Option<&ParsedTag> {
        self.arena
            .descendants(scope)
            .find(|node| query.matches(&self.arena, node))
    }

    pub fn find_all(&self, scope: NodeId, query: &TagQuery) -> Vec<&ParsedTag> {
        self.arena
            .descendants(scope)
            .filter(|node| query.matches(&self.arena, node))
            .collect()
    }

    pub fn find_next(&self, from: NodeId, query: &TagQuery) -> Option<&ParsedTag> {
        self.arena
            .following(from)
            .find(|node| query.matches(&self.arena, node))
    }

    pub fn find_previous(&self, from: NodeId, query: &TagQuery) -> Option<&ParsedTag> {
        self.arena
            .preceding(from)
            .find(|node| query.matches(&self.arena, node))
    }

    /// Render a node and its descendants to prose
    pub fn to_text(&self, node_id: NodeId) -> String {
        self.serializer.to_text(&self.arena, node_id)
    }

    /// Rendered text, trimmed
    pub fn inner_text(&self, node_id: NodeId) -> String {
        self.serializer.inner_text(&self.arena, node_id)
    }
}
