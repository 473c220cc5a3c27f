//! Wire format of the status bus: newline-delimited JSON-RPC 2.0.
//!
//! Methods: `get_property {tag}`, `list_properties`, `subscribe`. After
//! `subscribe` the connection only carries `properties_changed`
//! notifications.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use deskstat_core::Content;
use serde::{Deserialize, Serialize};

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

pub const GET_PROPERTY: &str = "get_property";
pub const LIST_PROPERTIES: &str = "list_properties";
pub const SUBSCRIBE: &str = "subscribe";
pub const PROPERTIES_CHANGED: &str = "properties_changed";

/// Changed properties keyed by tag. A tag appears at most once per batch.
pub type PropertyBatch = BTreeMap<String, Content>;

/// Current value of one property as held by the publisher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub label: String,
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

impl PropertyEntry {
    pub fn content(&self) -> Content {
        Content::new(self.label.clone(), self.text.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub id: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPropertyParams {
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPropertyResult {
    pub tag: String,
    #[serde(flatten)]
    pub entry: PropertyEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPropertiesResult {
    pub properties: BTreeMap<String, PropertyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertiesChangedParams {
    pub changed: PropertyBatch,
}

pub fn request(id: u64, method: &str, params: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
        "id": id,
    })
}

pub fn response(id: serde_json::Value, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "result": result,
        "id": id,
    })
}

pub fn error_response(id: serde_json::Value, code: i64, message: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "error": {"code": code, "message": message},
        "id": id,
    })
}

pub fn notification(batch: &PropertyBatch) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "method": PROPERTIES_CHANGED,
        "params": PropertiesChangedParams { changed: batch.clone() },
    })
}
