//! Error types for descriptor and descriptor-set operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SelectorError>;

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("Duplicate descriptor name: {0}")]
    DuplicateDescriptor(String),

    #[error("Descriptor not found: {0}")]
    DescriptorNotFound(String),

    #[error("Unknown attribute kind: {0}")]
    UnknownAttributeKind(String),

    #[error("Descriptor catalog error: {0}")]
    Json(#[from] serde_json::Error),
}
