// ── API-to-domain type conversions ──
//
// Bridges raw `flowdeck_api` wire types into `flowdeck_core::model`
// types. Timestamps become `DateTime<Utc>`, marker values are normalized,
// and the untouched record is kept on `Flow::raw`.

use chrono::{DateTime, Utc};

use flowdeck_api::wire::{ConnRecord, RequestRecord, ResponseRecord};
use flowdeck_api::{FlowRecord, WsMessage};

use crate::ingest::Delta;
use crate::model::{Flow, FlowId, FlowKind, RequestSummary, ResponseSummary};

/// Marker assigned when an older server only reports `marked: true`.
const DEFAULT_MARKER: &str = ":default:";

// ── Helpers ────────────────────────────────────────────────────────

/// Convert fractional epoch seconds to `DateTime<Utc>`.
#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn epoch_to_datetime(epoch: Option<f64>) -> Option<DateTime<Utc>> {
    let secs = epoch.filter(|s| s.is_finite() && *s >= 0.0)?;
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

fn normalize_marker(raw: &serde_json::Value) -> Option<String> {
    match raw {
        serde_json::Value::Bool(true) => Some(DEFAULT_MARKER.into()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn peer_address(conn: Option<&ConnRecord>) -> Option<String> {
    let peer = conn?.peername.as_ref()?;
    let host = peer.first()?.as_str()?;
    match peer.get(1).and_then(serde_json::Value::as_u64) {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_owned()),
    }
}

// ── Flow ───────────────────────────────────────────────────────────

impl From<RequestRecord> for RequestSummary {
    fn from(r: RequestRecord) -> Self {
        Self {
            host: r.pretty_host.filter(|h| !h.is_empty()).unwrap_or(r.host),
            method: r.method,
            scheme: r.scheme,
            port: r.port,
            path: r.path,
            http_version: r.http_version,
            content_length: r.content_length,
            started_at: epoch_to_datetime(r.timestamp_start),
        }
    }
}

impl From<ResponseRecord> for ResponseSummary {
    fn from(r: ResponseRecord) -> Self {
        Self {
            status_code: r.status_code,
            reason: r.reason,
            http_version: r.http_version,
            content_length: r.content_length,
            finished_at: epoch_to_datetime(r.timestamp_end),
        }
    }
}

impl From<FlowRecord> for Flow {
    fn from(record: FlowRecord) -> Self {
        let raw = serde_json::to_value(&record).unwrap_or_default();
        let kind = record
            .flow_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(FlowKind::Unknown);

        Self {
            id: FlowId::from(record.id),
            kind,
            intercepted: record.intercepted,
            modified: record.modified,
            marked: normalize_marker(&record.marked),
            client_addr: peer_address(record.client_conn.as_ref()),
            request: record.request.map(RequestSummary::from),
            response: record.response.map(ResponseSummary::from),
            error: record.error.map(|e| e.msg).filter(|m| !m.is_empty()),
            created_at: epoch_to_datetime(record.timestamp_created),
            raw,
        }
    }
}

// ── Push messages ──────────────────────────────────────────────────

impl From<WsMessage> for Delta<Flow> {
    fn from(msg: WsMessage) -> Self {
        match msg {
            WsMessage::Reset => Delta::Reset,
            WsMessage::Add(record) => Delta::Add(Flow::from(record)),
            WsMessage::Update(record) => Delta::Update(Flow::from(record)),
            WsMessage::Remove(id) => Delta::Remove(FlowId::from(id)),
            WsMessage::Unrecognized { resource, cmd } => Delta::Unrecognized {
                kind: format!(
                    "{}/{}",
                    resource.as_deref().unwrap_or("-"),
                    cmd.as_deref().unwrap_or("-")
                ),
            },
        }
    }
}
