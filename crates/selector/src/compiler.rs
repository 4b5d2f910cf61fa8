//! Locator compiler: descriptor → native query expression
//!
//! The query language is CSS. It cannot say "text contains X" or "any
//! attribute equals X", so for those kinds the compiler emits the widest
//! query that is still correct (the bare tag) and the resolver narrows the
//! result afterwards.

use crate::descriptor::{AttributeKind, SelectorDescriptor};
use serde::Serialize;
use std::fmt;

/// A compiled query, rendered to CSS by `Display`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum QueryExpression {
    /// `#value`, tag-less
    Id(String),
    /// `tag`
    Tag(String),
    /// `tag[attribute='value']`
    TagAttribute {
        tag: String,
        attribute: String,
        value: String,
    },
}

impl QueryExpression {
    /// Tag this query is restricted to, if any
    pub fn tag(&self) -> Option<&str> {
        match self {
            QueryExpression::Id(_) => None,
            QueryExpression::Tag(tag) | QueryExpression::TagAttribute { tag, .. } => Some(tag),
        }
    }

    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

fn css_tag(tag: &str) -> &str {
    if tag.is_empty() {
        "*"
    } else {
        tag
    }
}

fn escape_css_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape an identifier for use after `#`, following the rules of
/// `CSS.escape`
fn escape_css_identifier(ident: &str) -> String {
    use fmt::Write;

    if ident == "-" {
        return "\\-".to_string();
    }

    let mut escaped = String::with_capacity(ident.len() + 4);
    let leading_dash = ident.starts_with('-');
    for (i, c) in ident.chars().enumerate() {
        let digit_at_start = c.is_ascii_digit() && (i == 0 || (i == 1 && leading_dash));
        match c {
            '\0' => escaped.push('\u{FFFD}'),
            '\u{1}'..='\u{1f}' | '\u{7f}' => {
                let _ = write!(escaped, "\\{:x} ", c as u32);
            }
            _ if digit_at_start => {
                let _ = write!(escaped, "\\{:x} ", c as u32);
            }
            '-' | '_' => escaped.push(c),
            _ if c.is_ascii_alphanumeric() || !c.is_ascii() => escaped.push(c),
            _ => {
                escaped.push('\\');
                escaped.push(c);
            }
        }
    }
    escaped
}

impl fmt::Display for QueryExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryExpression::Id(id) => write!(f, "#{}", escape_css_identifier(id)),
            QueryExpression::Tag(tag) => f.write_str(css_tag(tag)),
            QueryExpression::TagAttribute {
                tag,
                attribute,
                value,
            } => write!(
                f,
                "{}[{}='{}']",
                css_tag(tag),
                attribute,
                escape_css_string(value)
            ),
        }
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Bare-tag query for `tag`
pub fn compile_bare(tag: &str) -> QueryExpression {
    QueryExpression::Tag(normalize_tag(tag))
}

/// Compile a descriptor. Total: every kind yields a query.
pub fn compile(descriptor: &SelectorDescriptor) -> QueryExpression {
    let kind = descriptor.attribute_kind();
    match kind {
        AttributeKind::Id => QueryExpression::Id(descriptor.attribute_value().to_string()),
        _ => match kind.attribute_name() {
            Some(attribute) => QueryExpression::TagAttribute {
                tag: normalize_tag(descriptor.tag()),
                attribute: attribute.to_string(),
                value: descriptor.attribute_value().to_string(),
            },
            None => compile_bare(descriptor.tag()),
        },
    }
}

/// Whether the compiled query over-matches and the resolver must narrow it
pub fn requires_post_filter(descriptor: &SelectorDescriptor) -> bool {
    !descriptor.attribute_kind().is_structural()
}

impl From<&SelectorDescriptor> for QueryExpression {
    fn from(descriptor: &SelectorDescriptor) -> Self {
        compile(descriptor)
    }
}
