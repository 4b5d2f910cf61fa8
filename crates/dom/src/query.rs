//! Tag queries - descriptor matching against parsed nodes
//!
//! Every part of a query is a case-insensitive regular expression. The tag
//! pattern must match the whole tag name; attribute values are matched in
//! whole or in part depending on the match mode.

use crate::arena::TagArena;
use crate::error::{DomError, Result};
use crate::serializer::TextSerializer;
use crate::types::ParsedTag;
use regex::{Regex, RegexBuilder};
use selector::{AttributeKind, MatchMode, PostFilter, SelectorDescriptor};

/// What the value pattern is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueTarget {
    Attributes,
    InnerText,
}

/// Compiled matcher for elements of a parsed tree
#[derive(Debug, Clone)]
pub struct TagQuery {
    tag: Option<Regex>,
    attribute: Option<Regex>,
    value: Option<Regex>,
    target: ValueTarget,
}

fn build_pattern(pattern: &str, anchored: bool) -> std::result::Result<Regex, regex::Error> {
    let source = if anchored {
        format!("^(?:{})$", pattern)
    } else {
        pattern.to_string()
    };
    RegexBuilder::new(&source).case_insensitive(true).build()
}

fn strict_pattern(pattern: &str, anchored: bool) -> Result<Regex> {
    build_pattern(pattern, anchored).map_err(|source| DomError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Falls back to a literal match when `pattern` is not a valid expression
fn lenient_pattern(pattern: &str, anchored: bool) -> Regex {
    build_pattern(pattern, anchored)
        .or_else(|_| build_pattern(&regex::escape(pattern), anchored))
        .unwrap_or_else(|_| Regex::new("$^").expect("static pattern"))
}

impl TagQuery {
    /// Match any element
    pub fn any() -> Self {
        Self {
            tag: None,
            attribute: None,
            value: None,
            target: ValueTarget::Attributes,
        }
    }

    /// Match elements whose whole tag name matches `pattern`
    pub fn tag(pattern: &str) -> Result<Self> {
        Ok(Self {
            tag: Some(strict_pattern(pattern, true)?),
            ..Self::any()
        })
    }

    /// Require an attribute whose whole name matches `pattern`
    pub fn with_attribute(mut self, pattern: &str) -> Result<Self> {
        self.attribute = Some(strict_pattern(pattern, true)?);
        Ok(self)
    }

    /// Require an attribute value (or, after [`TagQuery::on_inner_text`],
    /// the inner text) matching `pattern`
    pub fn with_value(mut self, pattern: &str, mode: MatchMode) -> Result<Self> {
        self.value = Some(strict_pattern(pattern, mode == MatchMode::Exact)?);
        Ok(self)
    }

    /// Test the value pattern against rendered inner text instead of
    /// attribute values
    pub fn on_inner_text(mut self) -> Self {
        self.target = ValueTarget::InnerText;
        self
    }

    /// Translate a descriptor. Never fails: invalid patterns match literally.
    pub fn from_descriptor(descriptor: &SelectorDescriptor) -> Self {
        let tag = descriptor.tag().trim();
        let value = descriptor.attribute_value();
        let kind = descriptor.attribute_kind();

        let mut query = Self::any();
        if !tag.is_empty() {
            query.tag = Some(lenient_pattern(tag, true));
        }

        let value_mode = match kind.post_filter() {
            Some(PostFilter::InnerText(mode)) => {
                query.target = ValueTarget::InnerText;
                mode
            }
            Some(PostFilter::AttributeText(mode)) => mode,
            None if kind == AttributeKind::None => MatchMode::Contains,
            None => MatchMode::Exact,
        };

        if let Some(attribute) = kind.attribute_name() {
            query.attribute = Some(lenient_pattern(attribute, true));
        }
        if !value.is_empty() {
            query.value = Some(lenient_pattern(value, value_mode == MatchMode::Exact));
        }

        query
    }

    /// Test one node. Non-elements never match.
    pub fn matches(&self, arena: &TagArena, node: &ParsedTag) -> bool {
        if !node.is_element() {
            return false;
        }

        if let Some(tag) = &self.tag {
            if !tag.is_match(&node.tag_name) {
                return false;
            }
        }

        match self.target {
            ValueTarget::InnerText => match &self.value {
                Some(value) => {
                    let text = TextSerializer::new().inner_text(arena, node.node_id);
                    value.is_match(&text)
                }
                None => true,
            },
            ValueTarget::Attributes => match (&self.attribute, &self.value) {
                (Some(key), Some(value)) => node
                    .attributes
                    .iter()
                    .any(|(k, v)| key.is_match(k) && value.is_match(v)),
                (Some(key), None) => node.attributes.iter().any(|(k, _)| key.is_match(k)),
                (None, Some(value)) => node.attributes.iter().any(|(_, v)| value.is_match(v)),
                (None, None) => true,
            },
        }
    }
}

impl From<&SelectorDescriptor> for TagQuery {
    fn from(descriptor: &SelectorDescriptor) -> Self {
        Self::from_descriptor(descriptor)
    }
}
