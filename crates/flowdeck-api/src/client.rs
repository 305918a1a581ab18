// Async HTTP client for the flows REST API.
//
// Endpoint layout (relative to the server root):
//   GET    flows                 list every flow
//   POST   flows/accept          resume all intercepted flows
//   POST   flows/{id}/accept     resume one flow
//   DELETE flows/{id}            drop one flow
//   POST   flows/{id}/duplicate  clone one flow
//   POST   flows/{id}/replay     replay the request
//   POST   flows/{id}/revert     undo local edits
//   PUT    flows/{id}            apply a partial update
//   POST   clear                 drop every flow
//   GET    flows/dump            export as a binary dump
//   POST   flows/dump            import a dump (multipart field `file`)

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::wire::{FlowList, FlowRecord};

// ── Error response shape ────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ── Client ──────────────────────────────────────────────────────────

/// Async client for the flows REST API.
///
/// Cheap to clone: the inner `reqwest::Client` is reference-counted.
#[derive(Clone)]
pub struct FlowsClient {
    http: reqwest::Client,
    base_url: Url,
}

impl FlowsClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from a server URL and transport settings.
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::with_client(base_url, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends in `/` so relative joins keep any path prefix.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The normalized server URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    fn flow_url(&self, id: &str, action: Option<&str>) -> Result<Url, Error> {
        let mut url = self.url("flows")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            segments.push(id);
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        Self::handle_response(resp).await
    }

    async fn post_empty(&self, url: Url) -> Result<(), Error> {
        debug!("POST {url}");
        let resp = self.http.post(url).send().await?;
        Self::handle_empty(resp).await
    }

    async fn put_empty<B: Serialize + Sync>(&self, url: Url, body: &B) -> Result<(), Error> {
        debug!("PUT {url}");
        let resp = self.http.put(url).json(body).send().await?;
        Self::handle_empty(resp).await
    }

    async fn delete_empty(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {url}");
        let resp = self.http.delete(url).send().await?;
        Self::handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_empty(resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn handle_bytes(resp: reqwest::Response) -> Result<Bytes, Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp.bytes().await?)
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let path = resp.url().path().to_owned();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Error::Authentication {
                message: format!("server rejected credentials (HTTP {})", status.as_u16()),
            };
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Error::NotFound { path };
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.message.or(e.error))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Listing ──────────────────────────────────────────────────────

    /// Fetch every flow the server currently holds, in server order.
    pub async fn list_flows(&self) -> Result<Vec<FlowRecord>, Error> {
        let list: FlowList = self.get(self.url("flows")?).await?;
        Ok(list.into_records())
    }

    // ── Per-flow actions ─────────────────────────────────────────────

    pub async fn accept(&self, id: &str) -> Result<(), Error> {
        self.post_empty(self.flow_url(id, Some("accept"))?).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        self.delete_empty(self.flow_url(id, None)?).await
    }

    pub async fn duplicate(&self, id: &str) -> Result<(), Error> {
        self.post_empty(self.flow_url(id, Some("duplicate"))?).await
    }

    pub async fn replay(&self, id: &str) -> Result<(), Error> {
        self.post_empty(self.flow_url(id, Some("replay"))?).await
    }

    pub async fn revert(&self, id: &str) -> Result<(), Error> {
        self.post_empty(self.flow_url(id, Some("revert"))?).await
    }

    /// Apply a partial update. `data` is sent verbatim as the JSON body.
    pub async fn update(&self, id: &str, data: &serde_json::Value) -> Result<(), Error> {
        self.put_empty(self.flow_url(id, None)?, data).await
    }

    // ── Bulk actions ─────────────────────────────────────────────────

    pub async fn accept_all(&self) -> Result<(), Error> {
        self.post_empty(self.url("flows/accept")?).await
    }

    pub async fn clear(&self) -> Result<(), Error> {
        self.post_empty(self.url("clear")?).await
    }

    /// Export every flow as an opaque dump.
    pub async fn download(&self) -> Result<Bytes, Error> {
        let url = self.url("flows/dump")?;
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        Self::handle_bytes(resp).await
    }

    /// Import a dump previously produced by [`download`](Self::download).
    pub async fn upload(&self, dump: Bytes) -> Result<(), Error> {
        let url = self.url("flows/dump")?;
        debug!("POST {url} ({} bytes)", dump.len());
        let part = Part::bytes(dump.to_vec()).file_name("flows");
        let form = Form::new().part("file", part);
        let resp = self.http.post(url).multipart(form).send().await?;
        Self::handle_empty(resp).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> FlowsClient {
        FlowsClient::with_client(base, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn base_url_keeps_path_prefix() {
        let c = client("http://localhost:8081/mitm");
        assert_eq!(c.url("flows").unwrap().as_str(), "http://localhost:8081/mitm/flows");
    }

    #[test]
    fn flow_ids_are_escaped_as_single_segment() {
        let c = client("http://localhost:8081");
        let url = c.flow_url("a/b", Some("accept")).unwrap();
        assert_eq!(url.path(), "/flows/a%2Fb/accept");
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            FlowsClient::with_client("not a url", reqwest::Client::new()),
            Err(Error::InvalidUrl(_))
        ));
    }
}
