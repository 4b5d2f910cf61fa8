//! Browser-session capability
//!
//! The resolver never talks to a browser directly. It asks a session to run
//! compiled queries and read back attributes and text, and optionally to run
//! scripts. Sessions are passed explicitly; there is no global driver.

use async_trait::async_trait;
use selector::QueryExpression;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::SessionError;

/// Opaque reference to an element owned by a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// All elements matching `query`, in document order
    async fn find_elements(
        &self,
        query: &QueryExpression,
    ) -> Result<Vec<ElementHandle>, SessionError>;

    /// Descendants of `scope` matching `query`, in document order
    async fn find_elements_within(
        &self,
        scope: &ElementHandle,
        query: &QueryExpression,
    ) -> Result<Vec<ElementHandle>, SessionError>;

    async fn get_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    /// Rendered text of the element
    async fn get_text(&self, element: &ElementHandle) -> Result<String, SessionError>;

    /// Script evaluation, if this session supports it
    fn scripting(&self) -> Option<&dyn ScriptEvaluator> {
        None
    }
}

#[async_trait]
pub trait ScriptEvaluator: Send + Sync {
    /// Evaluate a function body; `arguments[i]` is bound to `args[i]`
    async fn evaluate_script(
        &self,
        code: &str,
        args: &[ElementHandle],
    ) -> Result<Value, SessionError>;
}
