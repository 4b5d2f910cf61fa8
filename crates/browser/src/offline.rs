//! Document-backed session
//!
//! Runs compiled queries against a parsed markup snapshot instead of a live
//! page, so resolution can be exercised without a browser. The snapshot never
//! changes: a query that misses once misses until the timeout. There is no
//! script engine, so attribute-text kinds fail with `ScriptingUnavailable`.

use async_trait::async_trait;
use dom::{NodeId, ParsedDocumentTree, ParsedTag, ROOT_ID};
use selector::QueryExpression;
use std::sync::Arc;

use crate::capability::{BrowserSession, ElementHandle};
use crate::error::SessionError;

#[derive(Debug, Clone)]
pub struct DocumentSession {
    tree: Arc<ParsedDocumentTree>,
}

impl DocumentSession {
    pub fn new(tree: Arc<ParsedDocumentTree>) -> Self {
        Self { tree }
    }

    pub fn from_markup(markup: &str) -> Self {
        Self::new(Arc::new(ParsedDocumentTree::build(markup)))
    }

    pub fn tree(&self) -> &ParsedDocumentTree {
        &self.tree
    }

    /// Handle for a node of the snapshot
    pub fn handle(node_id: NodeId) -> ElementHandle {
        ElementHandle::new(node_id.to_string())
    }

    fn node(&self, element: &ElementHandle) -> Result<&ParsedTag, SessionError> {
        element
            .id()
            .parse::<NodeId>()
            .ok()
            .and_then(|node_id| self.tree.get(node_id).ok())
            .filter(|node| node.is_element())
            .ok_or_else(|| SessionError::StaleElement(element.id().to_string()))
    }

    fn query(&self, scope: NodeId, query: &QueryExpression) -> Vec<ElementHandle> {
        self.tree
            .arena()
            .descendants(scope)
            .filter(|node| node.is_element() && query_matches(query, node))
            .map(|node| Self::handle(node.node_id))
            .collect()
    }
}

/// CSS semantics: tag names compare case-insensitively, attribute values
/// compare exactly
fn query_matches(query: &QueryExpression, node: &ParsedTag) -> bool {
    let tag_matches = |tag: &str| tag.is_empty() || tag == "*" || node.tag_name.eq_ignore_ascii_case(tag);

    match query {
        QueryExpression::Id(id) => node.attr("id") == Some(id.as_str()),
        QueryExpression::Tag(tag) => tag_matches(tag),
        QueryExpression::TagAttribute {
            tag,
            attribute,
            value,
        } => tag_matches(tag) && node.attr(attribute) == Some(value.as_str()),
    }
}

#[async_trait]
impl BrowserSession for DocumentSession {
    async fn find_elements(
        &self,
        query: &QueryExpression,
    ) -> Result<Vec<ElementHandle>, SessionError> {
        Ok(self.query(ROOT_ID, query))
    }

    async fn find_elements_within(
        &self,
        scope: &ElementHandle,
        query: &QueryExpression,
    ) -> Result<Vec<ElementHandle>, SessionError> {
        let scope = self.node(scope)?.node_id;
        Ok(self.query(scope, query))
    }

    async fn get_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        Ok(self.node(element)?.attr(name).map(str::to_string))
    }

    async fn get_text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        let node_id = self.node(element)?.node_id;
        Ok(self.tree.inner_text(node_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selector::{compile, AttributeKind, SelectorDescriptor};
    use tokio_test::{assert_err, assert_ok};

    const PAGE: &str = r#"
        <form id="login">
            <input name="user" type="text">
            <input name="pass" type="password">
            <BUTTON class="btn">Sign <b>in</b></BUTTON>
        </form>
        <button class="btn primary">Help</button>
    "#;

    #[tokio::test]
    async fn test_find_elements() {
        let session = DocumentSession::from_markup(PAGE);

        let inputs = assert_ok!(session.find_elements(&QueryExpression::Tag("input".into())).await);
        assert_eq!(inputs.len(), 2);

        // Attribute values compare exactly, like CSS
        let btn = compile(&SelectorDescriptor::new("button", AttributeKind::Class, "btn"));
        assert_eq!(assert_ok!(session.find_elements(&btn).await).len(), 1);

        let form = compile(&SelectorDescriptor::new("ignored", AttributeKind::Id, "login"));
        let forms = assert_ok!(session.find_elements(&form).await);
        assert_eq!(forms.len(), 1);

        let within = assert_ok!(
            session
                .find_elements_within(&forms[0], &QueryExpression::Tag("*".into()))
                .await
        );
        assert_eq!(within.len(), 4);
    }

    #[tokio::test]
    async fn test_text_and_attributes() {
        let session = DocumentSession::from_markup(PAGE);
        let buttons = assert_ok!(session.find_elements(&QueryExpression::Tag("button".into())).await);

        assert_eq!(assert_ok!(session.get_text(&buttons[0]).await), "Sign in");
        assert_eq!(
            assert_ok!(session.get_attribute(&buttons[1], "CLASS").await).as_deref(),
            Some("btn primary")
        );
        assert_eq!(assert_ok!(session.get_attribute(&buttons[1], "id").await), None);
        assert!(session.scripting().is_none());
    }

    #[tokio::test]
    async fn test_unknown_handle_is_stale() {
        let session = DocumentSession::from_markup(PAGE);
        let err = assert_err!(session.get_text(&ElementHandle::new("9999")).await);
        assert!(matches!(err, SessionError::StaleElement(id) if id == "9999"));
        assert_err!(session.get_text(&ElementHandle::new("not-a-node")).await);
    }
}
