//! Named descriptor collections sharing one tag
//!
//! Page objects usually group the descriptors of one element type together:
//! every button on a page, every input of a form. The set owns the tag, so
//! callers only supply the attribute half of each descriptor.

use crate::descriptor::{SelectorDescriptor, TagName};
use crate::error::{Result, SelectorError};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Ordered, name-unique collection of descriptors for one tag
///
/// Names are compared case-insensitively. Insertion order is kept for
/// iteration.
#[derive(Debug, Clone, Default)]
pub struct SelectorDescriptorSet {
    tag: TagName,
    descriptors: Vec<SelectorDescriptor>,
    /// Lower-cased name → position in `descriptors`
    index: AHashMap<String, usize>,
}

/// On-disk catalog shape
#[derive(Serialize, Deserialize)]
struct SetDocument {
    tag: TagName,
    #[serde(default)]
    descriptors: Vec<SelectorDescriptor>,
}

fn index_key(descriptor: &SelectorDescriptor) -> String {
    descriptor.display_name().to_lowercase()
}

impl SelectorDescriptorSet {
    pub fn new(tag: impl Into<TagName>) -> Self {
        Self {
            tag: tag.into(),
            descriptors: Vec::new(),
            index: AHashMap::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Insert a descriptor, rewriting its tag to the set's tag
    ///
    /// Unnamed descriptors are keyed by their display name.
    pub fn insert(&mut self, mut descriptor: SelectorDescriptor) -> Result<&SelectorDescriptor> {
        descriptor.set_tag(&self.tag);
        let key = index_key(&descriptor);
        if self.index.contains_key(&key) {
            return Err(SelectorError::DuplicateDescriptor(descriptor.display_name()));
        }

        let position = self.descriptors.len();
        self.index.insert(key, position);
        self.descriptors.push(descriptor);
        Ok(&self.descriptors[position])
    }

    /// Look up a descriptor by name, ignoring case
    pub fn get(&self, name: &str) -> Result<&SelectorDescriptor> {
        self.index
            .get(&name.to_lowercase())
            .map(|&position| &self.descriptors[position])
            .ok_or_else(|| SelectorError::DescriptorNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    /// Remove a descriptor by name, ignoring case
    pub fn remove(&mut self, name: &str) -> Result<SelectorDescriptor> {
        let position = self
            .index
            .remove(&name.to_lowercase())
            .ok_or_else(|| SelectorError::DescriptorNotFound(name.to_string()))?;
        let removed = self.descriptors.remove(position);

        // Positions after the removed slot shift down by one
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }

        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectorDescriptor> {
        self.descriptors.iter()
    }

    /// Load a catalog of the form `{"tag": "...", "descriptors": [...]}`
    pub fn from_json(json: &str) -> Result<Self> {
        let document: SetDocument = serde_json::from_str(json)?;
        let mut set = Self::new(document.tag);
        for descriptor in document.descriptors {
            set.insert(descriptor)?;
        }
        Ok(set)
    }

    pub fn to_json(&self) -> Result<String> {
        let document = SetDocument {
            tag: self.tag.clone(),
            descriptors: self.descriptors.clone(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

impl<'a> IntoIterator for &'a SelectorDescriptorSet {
    type Item = &'a SelectorDescriptor;
    type IntoIter = std::slice::Iter<'a, SelectorDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.descriptors.iter()
    }
}
