// ── Flow domain types ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Entity;
use super::flow_id::FlowId;

/// What kind of exchange a flow captured.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[non_exhaustive]
pub enum FlowKind {
    Http,
    Tcp,
    Udp,
    Dns,
    #[default]
    Unknown,
}

/// Request line and framing details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSummary {
    pub method: String,
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub http_version: String,
    pub content_length: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
}

impl RequestSummary {
    /// `scheme://host[:port]path`, omitting the port when it is the scheme default.
    pub fn url(&self) -> String {
        let default_port = matches!(
            (self.scheme.as_str(), self.port),
            ("http", 80) | ("https", 443) | (_, 0)
        );
        if default_port {
            format!("{}://{}{}", self.scheme, self.host, self.path)
        } else {
            format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseSummary {
    pub status_code: u16,
    pub reason: String,
    pub http_version: String,
    pub content_length: Option<u64>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A captured network exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub id: FlowId,
    pub kind: FlowKind,
    pub intercepted: bool,
    pub modified: bool,
    /// Marker label, `None` when the flow is unmarked.
    pub marked: Option<String>,
    pub client_addr: Option<String>,
    pub request: Option<RequestSummary>,
    pub response: Option<ResponseSummary>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// The record exactly as the server sent it.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl Entity for Flow {
    type Id = FlowId;

    fn id(&self) -> &FlowId {
        &self.id
    }
}

impl Flow {
    pub fn method(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.method.as_str())
    }

    pub fn host(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.host.as_str())
    }

    pub fn path(&self) -> Option<&str> {
        self.request.as_ref().map(|r| r.path.as_str())
    }

    pub fn status_code(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status_code)
    }

    pub fn is_marked(&self) -> bool {
        self.marked.is_some()
    }

    /// Combined request and response body size, when either is known.
    pub fn total_size(&self) -> Option<u64> {
        let req = self.request.as_ref().and_then(|r| r.content_length);
        let resp = self.response.as_ref().and_then(|r| r.content_length);
        match (req, resp) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or(0) + b.unwrap_or(0)),
        }
    }

    /// Elapsed time between request start and response end.
    pub fn duration(&self) -> Option<chrono::Duration> {
        let start = self.request.as_ref()?.started_at?;
        let end = self.response.as_ref()?.finished_at?;
        Some(end - start)
    }

    /// One-line description used for free-text matching and plain output.
    pub fn summary_line(&self) -> String {
        let mut line = match &self.request {
            Some(req) => format!("{} {}", req.method, req.url()),
            None => format!("{} {}", self.kind, self.client_addr.as_deref().unwrap_or("-")),
        };
        if let Some(resp) = &self.response {
            line.push_str(&format!(" {}", resp.status_code));
        }
        if let Some(err) = &self.error {
            line.push_str(&format!(" error: {err}"));
        }
        line
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;

    /// Minimal HTTP flow for tests.
    pub(crate) fn http_flow(id: &str, method: &str, host: &str, path: &str, status: Option<u16>) -> Flow {
        Flow {
            id: FlowId::from(id),
            kind: FlowKind::Http,
            intercepted: false,
            modified: false,
            marked: None,
            client_addr: Some("127.0.0.1:50000".into()),
            request: Some(RequestSummary {
                method: method.into(),
                scheme: "https".into(),
                host: host.into(),
                port: 443,
                path: path.into(),
                http_version: "HTTP/1.1".into(),
                content_length: Some(0),
                started_at: None,
            }),
            response: status.map(|code| ResponseSummary {
                status_code: code,
                reason: String::new(),
                http_version: "HTTP/1.1".into(),
                content_length: Some(100),
                finished_at: None,
            }),
            error: None,
            created_at: None,
            raw: serde_json::Value::Null,
        }
    }
}
