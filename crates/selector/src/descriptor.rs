//! Selector descriptors
//!
//! A descriptor names an element abstractly: a tag, the kind of attribute to
//! filter on, and the value to look for. Nothing here knows about browsers or
//! markup; the compiler and resolvers give descriptors their meaning.

use crate::error::SelectorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element tag name. Open set: callers may use tags the engine never heard of.
pub type TagName = String;

/// What a descriptor's value is compared against.
///
/// Structural kinds map onto one HTML attribute and can be expressed as a
/// CSS attribute selector. The four text kinds cannot, and need a filtering
/// pass after the bare-tag query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttributeKind {
    Id,
    Class,
    Name,
    Type,
    Href,
    Src,
    Title,
    FormControlName,
    PlaceHolder,
    For,
    UatId,
    InnerTextContains,
    InnerTextExact,
    AttributeTextContains,
    AttributeTextExact,
    #[default]
    None,
}

/// How a text filter compares a candidate against the target value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    Contains,
    Exact,
}

/// Filter applied after a bare-tag query for the non-structural kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostFilter {
    /// Compare the element's rendered text
    InnerText(MatchMode),
    /// Compare every attribute value of the element, ignoring case
    AttributeText(MatchMode),
}

impl AttributeKind {
    pub const ALL: [AttributeKind; 16] = [
        AttributeKind::Id,
        AttributeKind::Class,
        AttributeKind::Name,
        AttributeKind::Type,
        AttributeKind::Href,
        AttributeKind::Src,
        AttributeKind::Title,
        AttributeKind::FormControlName,
        AttributeKind::PlaceHolder,
        AttributeKind::For,
        AttributeKind::UatId,
        AttributeKind::InnerTextContains,
        AttributeKind::InnerTextExact,
        AttributeKind::AttributeTextContains,
        AttributeKind::AttributeTextExact,
        AttributeKind::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Id => "Id",
            AttributeKind::Class => "Class",
            AttributeKind::Name => "Name",
            AttributeKind::Type => "Type",
            AttributeKind::Href => "Href",
            AttributeKind::Src => "Src",
            AttributeKind::Title => "Title",
            AttributeKind::FormControlName => "FormControlName",
            AttributeKind::PlaceHolder => "PlaceHolder",
            AttributeKind::For => "For",
            AttributeKind::UatId => "UatId",
            AttributeKind::InnerTextContains => "InnerTextContains",
            AttributeKind::InnerTextExact => "InnerTextExact",
            AttributeKind::AttributeTextContains => "AttributeTextContains",
            AttributeKind::AttributeTextExact => "AttributeTextExact",
            AttributeKind::None => "None",
        }
    }

    /// HTML attribute this kind filters on, if it filters on exactly one
    pub fn attribute_name(&self) -> Option<&'static str> {
        match self {
            AttributeKind::Id => Some("id"),
            AttributeKind::Class => Some("class"),
            AttributeKind::Name => Some("name"),
            AttributeKind::Type => Some("type"),
            AttributeKind::Href => Some("href"),
            AttributeKind::Src => Some("src"),
            AttributeKind::Title => Some("title"),
            AttributeKind::FormControlName => Some("formcontrolname"),
            AttributeKind::PlaceHolder => Some("placeholder"),
            AttributeKind::For => Some("for"),
            AttributeKind::UatId => Some("uatid"),
            _ => None,
        }
    }

    pub fn post_filter(&self) -> Option<PostFilter> {
        match self {
            AttributeKind::InnerTextContains => Some(PostFilter::InnerText(MatchMode::Contains)),
            AttributeKind::InnerTextExact => Some(PostFilter::InnerText(MatchMode::Exact)),
            AttributeKind::AttributeTextContains => {
                Some(PostFilter::AttributeText(MatchMode::Contains))
            }
            AttributeKind::AttributeTextExact => Some(PostFilter::AttributeText(MatchMode::Exact)),
            _ => None,
        }
    }

    /// True when the compiled query alone decides the match
    pub fn is_structural(&self) -> bool {
        self.post_filter().is_none()
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeKind {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AttributeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SelectorError::UnknownAttributeKind(s.to_string()))
    }
}

impl TryFrom<String> for AttributeKind {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AttributeKind> for String {
    fn from(kind: AttributeKind) -> Self {
        kind.as_str().to_string()
    }
}

impl MatchMode {
    /// Case-sensitive comparison. `Exact` ignores surrounding whitespace.
    pub fn matches(&self, candidate: &str, target: &str) -> bool {
        match self {
            MatchMode::Contains => candidate.contains(target),
            MatchMode::Exact => candidate.trim() == target.trim(),
        }
    }

    pub fn matches_ignore_case(&self, candidate: &str, target: &str) -> bool {
        self.matches(&candidate.to_lowercase(), &target.to_lowercase())
    }
}

/// Abstract description of one element
///
/// Immutable once built, except that a [`SelectorDescriptorSet`] rewrites the
/// tag to its own when the descriptor is inserted.
///
/// [`SelectorDescriptorSet`]: crate::set::SelectorDescriptorSet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorDescriptor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tag: TagName,
    #[serde(default)]
    attribute_kind: AttributeKind,
    #[serde(default)]
    attribute_value: String,
}

impl SelectorDescriptor {
    pub fn new(
        tag: impl Into<TagName>,
        attribute_kind: AttributeKind,
        attribute_value: impl Into<String>,
    ) -> Self {
        Self {
            name: String::new(),
            tag: tag.into(),
            attribute_kind,
            attribute_value: attribute_value.into(),
        }
    }

    pub fn named(
        name: impl Into<String>,
        tag: impl Into<TagName>,
        attribute_kind: AttributeKind,
        attribute_value: impl Into<String>,
    ) -> Self {
        Self::new(tag, attribute_kind, attribute_value).with_name(name)
    }

    /// Bare-tag descriptor (`AttributeKind::None`)
    pub fn tag_only(tag: impl Into<TagName>) -> Self {
        Self::new(tag, AttributeKind::None, "")
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attribute_kind(&self) -> AttributeKind {
        self.attribute_kind
    }

    pub fn attribute_value(&self) -> &str {
        &self.attribute_value
    }

    /// Name for logs and error messages: the given name, or `tag[Kind=value]`
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        match self.attribute_kind {
            AttributeKind::None if self.attribute_value.is_empty() => self.tag.clone(),
            kind => format!("{}[{}={}]", self.tag, kind, self.attribute_value),
        }
    }

    pub(crate) fn set_tag(&mut self, tag: &str) {
        self.tag = tag.to_string();
    }
}

impl fmt::Display for SelectorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_case_insensitively() {
        assert_eq!(
            "formcontrolname".parse::<AttributeKind>().unwrap(),
            AttributeKind::FormControlName
        );
        assert_eq!(
            " InnerTextExact ".parse::<AttributeKind>().unwrap(),
            AttributeKind::InnerTextExact
        );
        assert!(matches!(
            "colour".parse::<AttributeKind>(),
            Err(SelectorError::UnknownAttributeKind(_))
        ));
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(AttributeKind::PlaceHolder.attribute_name(), Some("placeholder"));
        assert_eq!(AttributeKind::UatId.attribute_name(), Some("uatid"));
        assert_eq!(AttributeKind::None.attribute_name(), None);
        assert_eq!(AttributeKind::InnerTextContains.attribute_name(), None);
    }

    #[test]
    fn test_post_filters() {
        let filtered: Vec<_> = AttributeKind::ALL
            .iter()
            .filter(|kind| !kind.is_structural())
            .collect();
        assert_eq!(filtered.len(), 4);
        assert_eq!(
            AttributeKind::AttributeTextExact.post_filter(),
            Some(PostFilter::AttributeText(MatchMode::Exact))
        );
    }

    #[test]
    fn test_match_modes() {
        assert!(MatchMode::Contains.matches("Save changes", "changes"));
        assert!(!MatchMode::Contains.matches("Save changes", "Changes"));
        assert!(MatchMode::Contains.matches_ignore_case("Save changes", "CHANGES"));
        assert!(MatchMode::Exact.matches("  Save \n", "Save"));
        assert!(!MatchMode::Exact.matches("Save changes", "Save"));
    }

    #[test]
    fn test_display_name() {
        let unnamed = SelectorDescriptor::new("button", AttributeKind::Class, "primary");
        assert_eq!(unnamed.display_name(), "button[Class=primary]");
        assert_eq!(SelectorDescriptor::tag_only("li").display_name(), "li");
        assert_eq!(unnamed.with_name("Submit").to_string(), "Submit");
    }

    #[test]
    fn test_descriptor_json() {
        let descriptor: SelectorDescriptor = serde_json::from_str(
            r#"{"name":"Email","tag":"input","attribute_kind":"placeholder","attribute_value":"you@example.com"}"#,
        )
        .unwrap();
        assert_eq!(descriptor.attribute_kind(), AttributeKind::PlaceHolder);
        assert_eq!(descriptor.attribute_value(), "you@example.com");

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["attribute_kind"], "PlaceHolder");
    }
}
