//! CDP Protocol Types
//!
//! These are the fundamental types for CDP communication, plus the few
//! DOM/Runtime payloads element lookup needs. Keep them minimal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request ID - monotonically increasing
pub type RequestId = u64;

/// Target ID from Chrome
pub type TargetId = String;

/// Session ID for attached targets
pub type SessionId = String;

/// DOM node id, valid until the document is requested again
pub type DomNodeId = u32;

/// Runtime remote object id
pub type RemoteObjectId = String;

/// CDP Request sent to browser
#[derive(Debug, Clone, Serialize)]
pub struct CDPRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

/// CDP Response from browser
#[derive(Debug, Clone, Deserialize)]
pub struct CDPResponse {
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<CDPError>,
}

/// CDP Error
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CDPError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// CDP Event from browser (no request ID)
#[derive(Debug, Clone, Deserialize)]
pub struct CDPEvent {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// Unified CDP Message (response or event)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CDPMessage {
    Response(CDPResponse),
    Event(CDPEvent),
}

/// Target Info from Target.getTargetInfo / Target.getTargets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetInfo {
    #[serde(rename = "targetId")]
    pub target_id: TargetId,
    #[serde(rename = "type")]
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
}

/// Result of Target.getTargets
#[derive(Debug, Clone, Deserialize)]
pub struct GetTargetsResult {
    #[serde(rename = "targetInfos")]
    pub target_infos: Vec<TargetInfo>,
}

/// Result of Target.attachToTarget
#[derive(Debug, Clone, Deserialize)]
pub struct AttachToTargetResult {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
}

/// Node reference inside DOM.getDocument
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentNode {
    #[serde(rename = "nodeId")]
    pub node_id: DomNodeId,
}

/// Result of DOM.getDocument
#[derive(Debug, Clone, Deserialize)]
pub struct GetDocumentResult {
    pub root: DocumentNode,
}

/// Result of DOM.querySelectorAll
#[derive(Debug, Clone, Deserialize)]
pub struct QuerySelectorAllResult {
    #[serde(rename = "nodeIds")]
    pub node_ids: Vec<DomNodeId>,
}

/// Result of DOM.getAttributes: flat `[name, value, name, value, ...]`
#[derive(Debug, Clone, Deserialize)]
pub struct GetAttributesResult {
    pub attributes: Vec<String>,
}

impl GetAttributesResult {
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }
}

/// Runtime.RemoteObject (the fields element lookup reads)
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub object_type: String,
    #[serde(rename = "objectId", default)]
    pub object_id: Option<RemoteObjectId>,
    #[serde(default)]
    pub value: Option<Value>,
}

/// Result of DOM.resolveNode
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveNodeResult {
    pub object: RemoteObject,
}

/// Result of Runtime.evaluate / Runtime.callFunctionOn
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(rename = "exceptionDetails", default)]
    pub exception_details: Option<Value>,
}
