//! Arena-based tag tree storage
//!
//! "Bad programmers worry about the code. Good programmers worry about
//! data structures and their relationships."
//!
//! The tree needs two views of the same nodes: nesting (parent/children)
//! for scoped searches, and flat source order (previous/next) for
//! "next in document" searches. Nodes are appended in the order their first
//! character appears in the source, so the arena itself is the flat view:
//!
//! ```text
//! <div><p>A</p><p>B</p></div>
//!
//! Arena: [#document][div][p][#text A][p][#text B]
//!            0        1   2     3     4     5
//! next(2) = 3, previous(4) = 3, children(1) = [2, 4]
//! ```

use crate::error::{DomError, Result};
use crate::types::{NodeId, NodeKind, ParsedTag, ROOT_ID};

#[derive(Debug, Clone)]
pub struct TagArena {
    /// All nodes stored sequentially, in document order
    nodes: Vec<ParsedTag>,
}

impl TagArena {
    /// Create an arena holding only the document node
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(ParsedTag::new(
            ROOT_ID,
            NodeKind::Document,
            "#document".to_string(),
            1,
        ));
        Self { nodes }
    }

    /// Append a node under `parent`, returns its ID
    ///
    /// The node's id and parent link are overwritten.
    pub fn append_child(&mut self, parent: NodeId, mut node: ParsedTag) -> Result<NodeId> {
        let node_id = self.nodes.len() as NodeId;
        self.get_mut(parent)?.children_ids.push(node_id);
        node.node_id = node_id;
        node.parent_id = Some(parent);
        self.nodes.push(node);
        Ok(node_id)
    }

    pub fn get(&self, node_id: NodeId) -> Result<&ParsedTag> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut ParsedTag> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn root(&self) -> &ParsedTag {
        &self.nodes[ROOT_ID as usize]
    }

    /// Total number of nodes, document node included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing besides the document node was parsed
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParsedTag> {
        self.nodes.iter()
    }

    pub fn children(&self, node_id: NodeId) -> Result<Vec<&ParsedTag>> {
        let node = self.get(node_id)?;
        node.children_ids
            .iter()
            .map(|&child_id| self.get(child_id))
            .collect()
    }

    pub fn parent(&self, node_id: NodeId) -> Result<Option<&ParsedTag>> {
        let node = self.get(node_id)?;
        match node.parent_id {
            Some(parent_id) => Ok(Some(self.get(parent_id)?)),
            None => Ok(None),
        }
    }

    /// Next node in document order, at any depth
    pub fn next(&self, node_id: NodeId) -> Option<&ParsedTag> {
        self.nodes.get(node_id as usize + 1)
    }

    /// Previous node in document order, at any depth. The document node is
    /// never returned, and unknown ids have no previous node.
    pub fn previous(&self, node_id: NodeId) -> Option<&ParsedTag> {
        match node_id as usize {
            0 | 1 => None,
            id if id < self.nodes.len() => self.nodes.get(id - 1),
            _ => None,
        }
    }

    /// Nodes after `node_id` in document order
    pub fn following(&self, node_id: NodeId) -> impl Iterator<Item = &ParsedTag> {
        let start = (node_id as usize + 1).min(self.nodes.len());
        self.nodes[start..].iter()
    }

    /// Nodes before `node_id` in document order, nearest first. Empty for
    /// unknown ids.
    pub fn preceding(&self, node_id: NodeId) -> impl Iterator<Item = &ParsedTag> {
        let end = match node_id as usize {
            id if id < self.nodes.len() => id,
            _ => 0,
        };
        self.nodes[..end].iter().skip(1).rev()
    }

    /// Descendants of `scope` in depth-first pre-order, `scope` excluded
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        let stack = match self.get(scope) {
            Ok(node) => node.children_ids.iter().rev().copied().collect(),
            Err(_) => Vec::new(),
        };
        Descendants { arena: self, stack }
    }
}

impl Default for TagArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order walk over a subtree
pub struct Descendants<'a> {
    arena: &'a TagArena,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a ParsedTag;

    fn next(&mut self) -> Option<Self::Item> {
        let node_id = self.stack.pop()?;
        let node = self.arena.get(node_id).ok()?;
        self.stack.extend(node.children_ids.iter().rev().copied());
        Some(node)
    }
}
