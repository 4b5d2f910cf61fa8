//! CDP Session - Represents a connection to a specific browser target
//!
//! Design: Lightweight wrapper around CDPClient with target-specific context.
//! All sessions share the same WebSocket - no per-session connection overhead.
//! Besides raw `send`, it exposes the handful of DOM/Runtime commands element
//! lookup is built from.

use super::client::{CDPClient, CDPError, Result};
use super::protocol::*;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Domains enabled on attach unless the caller asks otherwise
pub const DEFAULT_DOMAINS: &[&str] = &["Page", "DOM", "Runtime"];

/// CDP Session bound to a specific target
#[derive(Clone)]
pub struct CDPSession {
    /// Shared CDP client
    client: Arc<CDPClient>,

    /// Target this session is attached to
    pub target_id: TargetId,

    /// Session ID assigned by Chrome
    pub session_id: SessionId,

    /// Cached target info
    pub title: String,
    pub url: String,
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(CDPError::Json)
}

impl CDPSession {
    /// Attach to a target and create session
    pub async fn attach(
        client: Arc<CDPClient>,
        target_id: TargetId,
        domains: Option<Vec<&str>>,
    ) -> Result<Self> {
        let result = client
            .send_request(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true,
                })),
                None,
            )
            .await?;

        let attach_result: AttachToTargetResult = decode(result)?;
        let session_id = attach_result.session_id;

        let domains = domains.unwrap_or_else(|| DEFAULT_DOMAINS.to_vec());

        // Enable all domains in parallel
        let enable_futures: Vec<_> = domains
            .into_iter()
            .map(|domain| {
                let client = client.clone();
                let session_id = session_id.clone();
                async move {
                    client
                        .send_request(format!("{}.enable", domain), None, Some(session_id))
                        .await
                }
            })
            .collect();

        // Wait for all enables (ignore individual failures)
        let results = futures_util::future::join_all(enable_futures).await;
        let failures = results.iter().filter(|r| r.is_err()).count();
        if failures > 0 {
            tracing::warn!("Some domain enables failed: {}/{}", failures, results.len());
        }

        let info_result = client
            .send_request(
                "Target.getTargetInfo",
                Some(json!({ "targetId": &target_id })),
                None,
            )
            .await?;
        let target_info: TargetInfo = decode(info_result["targetInfo"].clone())?;

        Ok(Self {
            client,
            target_id,
            session_id,
            title: target_info.title,
            url: target_info.url,
        })
    }

    /// Attach to the first page target, creating one if the browser has none
    pub async fn attach_first_page(client: Arc<CDPClient>) -> Result<Self> {
        let targets: GetTargetsResult =
            decode(client.send_request("Target.getTargets", None, None).await?)?;

        let target_id = match targets
            .target_infos
            .into_iter()
            .find(|info| info.target_type == "page")
        {
            Some(info) => info.target_id,
            None => {
                let created = client
                    .send_request(
                        "Target.createTarget",
                        Some(json!({ "url": "about:blank" })),
                        None,
                    )
                    .await?;
                created["targetId"]
                    .as_str()
                    .ok_or(CDPError::InvalidResponse(0))?
                    .to_string()
            }
        };

        Self::attach(client, target_id, None).await
    }

    /// Send command within this session's context
    pub async fn send(&self, method: impl Into<String>, params: Option<Value>) -> Result<Value> {
        self.client
            .send_request(method, params, Some(self.session_id.clone()))
            .await
    }

    /// Navigate to URL
    pub async fn navigate(&self, url: impl Into<String>) -> Result<Value> {
        self.send("Page.navigate", Some(json!({ "url": url.into() })))
            .await
    }

    /// Evaluate JavaScript, returning the value by value
    pub async fn evaluate(&self, expression: impl Into<String>) -> Result<EvaluateResult> {
        let result = self
            .send(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression.into(),
                    "returnByValue": true,
                })),
            )
            .await?;
        decode(result)
    }

    /// Document root node id. Must be fetched before node ids are usable.
    pub async fn document_node(&self) -> Result<DomNodeId> {
        let result: GetDocumentResult = decode(
            self.send("DOM.getDocument", Some(json!({ "depth": 0 })))
                .await?,
        )?;
        Ok(result.root.node_id)
    }

    /// CSS query under `node_id`, in document order
    pub async fn query_selector_all(
        &self,
        node_id: DomNodeId,
        selector: &str,
    ) -> Result<Vec<DomNodeId>> {
        let result: QuerySelectorAllResult = decode(
            self.send(
                "DOM.querySelectorAll",
                Some(json!({ "nodeId": node_id, "selector": selector })),
            )
            .await?,
        )?;
        Ok(result.node_ids)
    }

    pub async fn get_attributes(&self, node_id: DomNodeId) -> Result<GetAttributesResult> {
        decode(
            self.send("DOM.getAttributes", Some(json!({ "nodeId": node_id })))
                .await?,
        )
    }

    /// Runtime object for a DOM node, usable as `this` or a call argument
    pub async fn resolve_node(&self, node_id: DomNodeId) -> Result<RemoteObjectId> {
        let result: ResolveNodeResult = decode(
            self.send("DOM.resolveNode", Some(json!({ "nodeId": node_id })))
                .await?,
        )?;
        result.object.object_id.ok_or(CDPError::InvalidResponse(0))
    }

    /// Call `function_declaration` with `this = object_id` and the given
    /// objects as arguments, returning the result by value
    pub async fn call_function_on(
        &self,
        object_id: &RemoteObjectId,
        function_declaration: &str,
        arguments: &[RemoteObjectId],
    ) -> Result<EvaluateResult> {
        let arguments: Vec<Value> = arguments
            .iter()
            .map(|id| json!({ "objectId": id }))
            .collect();

        let result = self
            .send(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": function_declaration,
                    "arguments": arguments,
                    "returnByValue": true,
                })),
            )
            .await?;
        decode(result)
    }
}
