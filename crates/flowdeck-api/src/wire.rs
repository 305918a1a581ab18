//! Wire types for the flows REST API and the push channel.
//!
//! Records mirror the JSON the server emits. Every struct keeps unknown
//! fields in a flattened `extra` map so nothing the server sends is lost
//! when a record is re-serialized.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

/// Resource name carried by flow-related push messages.
pub const FLOWS_RESOURCE: &str = "flows";

/// Push command that tells clients to discard everything and re-fetch.
pub const CMD_RESET: &str = "reset";

const CMD_ADD: &str = "add";
const CMD_UPDATE: &str = "update";
const CMD_REMOVE: &str = "remove";

// ── Flow records ────────────────────────────────────────────────────

/// A single flow as serialized by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub flow_type: Option<String>,
    pub intercepted: bool,
    pub modified: bool,
    /// Older servers send a bool, newer ones a marker string (`""` when unmarked).
    pub marked: Value,
    pub client_conn: Option<ConnRecord>,
    pub request: Option<RequestRecord>,
    pub response: Option<ResponseRecord>,
    pub error: Option<ErrorRecord>,
    /// Seconds since the epoch, fractional.
    pub timestamp_created: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnRecord {
    /// `[host, port]`
    pub peername: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestRecord {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub http_version: String,
    pub pretty_host: Option<String>,
    #[serde(rename = "contentLength")]
    pub content_length: Option<u64>,
    pub timestamp_start: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseRecord {
    pub status_code: u16,
    pub reason: String,
    pub http_version: String,
    #[serde(rename = "contentLength")]
    pub content_length: Option<u64>,
    pub timestamp_end: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorRecord {
    pub msg: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `GET /flows`. Accepts both the `{data: [...]}` envelope and a
/// bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FlowList {
    Envelope { data: Vec<FlowRecord> },
    Bare(Vec<FlowRecord>),
}

impl FlowList {
    pub(crate) fn into_records(self) -> Vec<FlowRecord> {
        match self {
            Self::Envelope { data } | Self::Bare(data) => data,
        }
    }
}

// ── Push-channel messages ───────────────────────────────────────────

/// A decoded push-channel message.
///
/// Only the reset sentinel and the flow delta commands carry meaning;
/// everything else is surfaced as [`WsMessage::Unrecognized`] so callers
/// can drop it without treating it as fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    Reset,
    Add(FlowRecord),
    Update(FlowRecord),
    Remove(String),
    Unrecognized {
        resource: Option<String>,
        cmd: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    cmd: Option<String>,
    #[serde(default)]
    data: Value,
}

impl WsMessage {
    /// Decode a text frame.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let raw: RawMessage =
            serde_json::from_str(text).map_err(|e| Error::Protocol(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Decode an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        let raw: RawMessage =
            serde_json::from_value(value).map_err(|e| Error::Protocol(e.to_string()))?;
        Self::from_raw(raw)
    }

    pub fn is_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }

    fn from_raw(raw: RawMessage) -> Result<Self, Error> {
        let RawMessage {
            resource,
            cmd,
            data,
        } = raw;

        // Reset applies regardless of which resource announced it.
        if cmd.as_deref() == Some(CMD_RESET) {
            return Ok(Self::Reset);
        }
        if resource.as_deref().is_some_and(|r| r != FLOWS_RESOURCE) {
            return Ok(Self::Unrecognized { resource, cmd });
        }

        let name = cmd.clone().unwrap_or_default();
        match name.as_str() {
            CMD_ADD => decode_flow(data).map(Self::Add),
            CMD_UPDATE => decode_flow(data).map(Self::Update),
            CMD_REMOVE => remove_target(&data)
                .map(Self::Remove)
                .ok_or_else(|| Error::Protocol("remove message without a flow id".into())),
            _ => Ok(Self::Unrecognized { resource, cmd }),
        }
    }
}

fn decode_flow(data: Value) -> Result<FlowRecord, Error> {
    let record: FlowRecord =
        serde_json::from_value(data).map_err(|e| Error::Protocol(format!("bad flow payload: {e}")))?;
    if record.id.is_empty() {
        return Err(Error::Protocol("flow payload without an id".into()));
    }
    Ok(record)
}

/// `remove` carries either the bare id or the removed flow object.
fn remove_target(data: &Value) -> Option<String> {
    match data {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Object(map) => map
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn reset_is_recognized_for_any_resource() {
        let msg = WsMessage::parse(r#"{"resource":"events","cmd":"reset"}"#).unwrap();
        assert!(msg.is_reset());
        let msg = WsMessage::parse(r#"{"cmd":"reset"}"#).unwrap();
        assert!(msg.is_reset());
    }

    #[test]
    fn add_decodes_flow_payload() {
        let msg = WsMessage::from_value(json!({
            "resource": "flows",
            "cmd": "add",
            "data": {
                "id": "f1",
                "type": "http",
                "intercepted": true,
                "request": {"method": "GET", "host": "example.com", "port": 443, "path": "/"},
                "websocket": null
            }
        }))
        .unwrap();

        let WsMessage::Add(record) = msg else {
            panic!("expected Add, got {msg:?}");
        };
        assert_eq!(record.id, "f1");
        assert!(record.intercepted);
        assert_eq!(record.request.unwrap().host, "example.com");
        assert!(record.extra.contains_key("websocket"));
    }

    #[test]
    fn remove_accepts_bare_id_and_object() {
        let bare = WsMessage::parse(r#"{"resource":"flows","cmd":"remove","data":"f9"}"#).unwrap();
        assert_eq!(bare, WsMessage::Remove("f9".into()));

        let obj =
            WsMessage::parse(r#"{"resource":"flows","cmd":"remove","data":{"id":"f9"}}"#).unwrap();
        assert_eq!(obj, WsMessage::Remove("f9".into()));
    }

    #[test]
    fn remove_without_id_is_a_protocol_error() {
        let err = WsMessage::parse(r#"{"resource":"flows","cmd":"remove","data":42}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn other_resources_are_unrecognized() {
        let msg = WsMessage::parse(r#"{"resource":"events","cmd":"add","data":{}}"#).unwrap();
        assert_eq!(
            msg,
            WsMessage::Unrecognized {
                resource: Some("events".into()),
                cmd: Some("add".into()),
            }
        );
    }

    #[test]
    fn unknown_flow_commands_are_unrecognized() {
        let msg = WsMessage::parse(r#"{"resource":"flows","cmd":"frobnicate"}"#).unwrap();
        assert!(matches!(msg, WsMessage::Unrecognized { .. }));
    }

    #[test]
    fn malformed_json_is_a_protocol_error() {
        assert!(matches!(
            WsMessage::parse("{not json"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn flow_list_accepts_envelope_and_bare_array() {
        let env: FlowList = serde_json::from_str(r#"{"data":[{"id":"a"},{"id":"b"}]}"#).unwrap();
        assert_eq!(env.into_records().len(), 2);
        let bare: FlowList = serde_json::from_str(r#"[{"id":"a"}]"#).unwrap();
        assert_eq!(bare.into_records()[0].id, "a");
    }
}
