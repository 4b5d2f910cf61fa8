//! CDP-backed browser session
//!
//! Element handles are DOM node ids. Node ids are only valid for the document
//! they were issued from, so the cached root is dropped whenever Chrome
//! reports `DOM.documentUpdated` (or we navigate).

use async_trait::async_trait;
use selector::QueryExpression;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::capability::{BrowserSession, ElementHandle, ScriptEvaluator};
use crate::cdp::protocol::{DomNodeId, EvaluateResult};
use crate::cdp::{CDPClient, CDPError, CDPEvent, CDPSession};
use crate::config::CdpConfig;
use crate::error::SessionError;

const INNER_TEXT_FUNCTION: &str = "function() { return this.innerText; }";

pub struct CdpPage {
    client: Arc<CDPClient>,
    session: CDPSession,
    document: Mutex<Option<DomNodeId>>,
    document_stale: Arc<AtomicBool>,
}

impl CdpPage {
    /// Connect to the browser and attach to its first page
    pub async fn connect(config: &CdpConfig) -> Result<Self, SessionError> {
        let client = CDPClient::connect_with_config(config).await?;
        let session = CDPSession::attach_first_page(client.clone()).await?;
        tracing::info!("Attached to {} ({})", session.target_id, session.url);
        Ok(Self::new(client, session))
    }

    pub fn new(client: Arc<CDPClient>, session: CDPSession) -> Self {
        let document_stale = Arc::new(AtomicBool::new(false));

        let flag = document_stale.clone();
        let session_id = session.session_id.clone();
        client.subscribe(
            "DOM.documentUpdated",
            Arc::new(move |event: CDPEvent| {
                if event.session_id.as_deref() == Some(session_id.as_str()) {
                    flag.store(true, Ordering::SeqCst);
                }
            }),
        );

        Self {
            client,
            session,
            document: Mutex::new(None),
            document_stale,
        }
    }

    pub fn session(&self) -> &CDPSession {
        &self.session
    }

    pub async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.session.navigate(url).await?;
        *self.document.lock().await = None;
        Ok(())
    }

    pub async fn close(self) -> Result<(), SessionError> {
        self.client.close().await?;
        Ok(())
    }

    async fn document_node(&self) -> Result<DomNodeId, SessionError> {
        let mut document = self.document.lock().await;
        let stale = self.document_stale.swap(false, Ordering::SeqCst);

        match *document {
            Some(node_id) if !stale => Ok(node_id),
            _ => {
                let node_id = self.session.document_node().await?;
                tracing::debug!("Document root is node {}", node_id);
                *document = Some(node_id);
                Ok(node_id)
            }
        }
    }

    async fn query(
        &self,
        scope: DomNodeId,
        query: &QueryExpression,
    ) -> Result<Vec<ElementHandle>, SessionError> {
        let node_ids = self
            .session
            .query_selector_all(scope, &query.to_css())
            .await?;
        Ok(node_ids
            .into_iter()
            .map(|node_id| ElementHandle::new(node_id.to_string()))
            .collect())
    }

    async fn remote_object(&self, element: &ElementHandle) -> Result<String, SessionError> {
        let node_id = node_id(element)?;
        self.session
            .resolve_node(node_id)
            .await
            .map_err(|e| stale_or(element, e))
    }
}

fn node_id(element: &ElementHandle) -> Result<DomNodeId, SessionError> {
    element
        .id()
        .parse()
        .map_err(|_| SessionError::StaleElement(element.id().to_string()))
}

/// Chrome answers `-32000` for node ids it no longer knows
fn stale_or(element: &ElementHandle, error: CDPError) -> SessionError {
    match error {
        CDPError::Protocol { code: -32000, .. } => {
            SessionError::StaleElement(element.id().to_string())
        }
        other => SessionError::Cdp(other),
    }
}

fn script_value(result: EvaluateResult) -> Result<Value, SessionError> {
    if let Some(details) = result.exception_details {
        let message = details["exception"]["description"]
            .as_str()
            .or_else(|| details["text"].as_str())
            .unwrap_or("unknown exception")
            .to_string();
        return Err(SessionError::Script(message));
    }
    Ok(result.result.value.unwrap_or(Value::Null))
}

#[async_trait]
impl BrowserSession for CdpPage {
    async fn find_elements(
        &self,
        query: &QueryExpression,
    ) -> Result<Vec<ElementHandle>, SessionError> {
        let root = self.document_node().await?;
        self.query(root, query).await
    }

    async fn find_elements_within(
        &self,
        scope: &ElementHandle,
        query: &QueryExpression,
    ) -> Result<Vec<ElementHandle>, SessionError> {
        let scope_id = node_id(scope)?;
        self.query(scope_id, query)
            .await
            .map_err(|e| match e {
                SessionError::Cdp(e) => stale_or(scope, e),
                other => other,
            })
    }

    async fn get_attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let attributes = self
            .session
            .get_attributes(node_id(element)?)
            .await
            .map_err(|e| stale_or(element, e))?;

        let value = attributes
            .pairs()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.to_string());
        Ok(value)
    }

    async fn get_text(&self, element: &ElementHandle) -> Result<String, SessionError> {
        let object_id = self.remote_object(element).await?;
        let result = self
            .session
            .call_function_on(&object_id, INNER_TEXT_FUNCTION, &[])
            .await?;

        match script_value(result)? {
            Value::String(text) => Ok(text),
            Value::Null => Ok(String::new()),
            other => Err(SessionError::InvalidResponse(format!(
                "innerText of {} was {}",
                element, other
            ))),
        }
    }

    fn scripting(&self) -> Option<&dyn ScriptEvaluator> {
        Some(self)
    }
}

#[async_trait]
impl ScriptEvaluator for CdpPage {
    async fn evaluate_script(
        &self,
        code: &str,
        args: &[ElementHandle],
    ) -> Result<Value, SessionError> {
        if args.is_empty() {
            let result = self
                .session
                .evaluate(format!("(function() {{ {} }})()", code))
                .await?;
            return script_value(result);
        }

        let mut object_ids = Vec::with_capacity(args.len());
        for element in args {
            object_ids.push(self.remote_object(element).await?);
        }

        let function = format!("function() {{ {} }}", code);
        let result = self
            .session
            .call_function_on(&object_ids[0], &function, &object_ids)
            .await?;
        script_value(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdp::protocol::RemoteObject;
    use crate::resolver::ElementResolver;
    use selector::{AttributeKind, SelectorDescriptor};
    use serde_json::json;

    #[test]
    fn test_script_value() {
        let ok = EvaluateResult {
            result: RemoteObject {
                object_type: "object".into(),
                object_id: None,
                value: Some(json!({"id": "main"})),
            },
            exception_details: None,
        };
        assert_eq!(script_value(ok).unwrap()["id"], "main");

        let thrown = EvaluateResult {
            result: RemoteObject {
                object_type: "object".into(),
                object_id: Some("1".into()),
                value: None,
            },
            exception_details: Some(json!({
                "text": "Uncaught",
                "exception": {"description": "TypeError: x is undefined"}
            })),
        };
        assert!(matches!(
            script_value(thrown),
            Err(SessionError::Script(message)) if message.starts_with("TypeError")
        ));
    }

    #[test]
    fn test_stale_mapping() {
        let element = ElementHandle::new("12");
        let error = CDPError::Protocol {
            code: -32000,
            message: "No node with given id found".into(),
        };
        assert!(matches!(stale_or(&element, error), SessionError::StaleElement(id) if id == "12"));
        assert!(matches!(
            stale_or(&element, CDPError::Closed),
            SessionError::Cdp(CDPError::Closed)
        ));
        assert!(matches!(
            node_id(&ElementHandle::new("abc")),
            Err(SessionError::StaleElement(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Needs running Chrome
    async fn test_resolve_live() {
        let page = CdpPage::connect(&CdpConfig::with_endpoint(
            "ws://localhost:9222/devtools/browser",
        ))
        .await
        .unwrap();
        page.navigate("data:text/html,<div id=main><p title=Intro>Hello</p></div>")
            .await
            .unwrap();

        let resolver = ElementResolver::default();
        let intro = resolver
            .resolve(&SelectorDescriptor::new("p", AttributeKind::Title, "Intro"), &page)
            .await
            .unwrap();
        assert_eq!(page.get_text(&intro).await.unwrap(), "Hello");

        let by_attribute = resolver
            .resolve(
                &SelectorDescriptor::new("div", AttributeKind::AttributeTextExact, "MAIN"),
                &page,
            )
            .await
            .unwrap();
        assert_eq!(
            page.get_attribute(&by_attribute, "id").await.unwrap().as_deref(),
            Some("main")
        );
    }
}
