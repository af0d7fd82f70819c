//! HTTP Transport for MCP
//!
//! Sends each JSON-RPC message as an HTTP POST and queues the reply for
//! `receive()`. Works with plain JSON endpoints and with streamable-HTTP
//! servers that answer with a single SSE-framed message.
//!
//! ```rust,ignore
//! let transport = HttpTransport::new("https://your-mcp-server.com/mcp")
//!     .with_header("Authorization", "Bearer token")
//!     .build()?;
//!
//! let client = McpClient::connect(transport).await?;
//! ```

use crate::protocol::McpError;
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, trace};

/// Header carrying the server-assigned session for streamable HTTP servers
const SESSION_HEADER: &str = "mcp-session-id";

/// HTTP Transport for MCP communication
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    headers: BTreeMap<String, String>,
    session_id: Option<String>,
    connected: bool,
    responses: VecDeque<String>,
}

impl HttpTransport {
    /// Create a new HTTP transport builder
    pub fn new(url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Session assigned by the server during initialization, if any
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

/// Builder for HttpTransport
pub struct HttpTransportBuilder {
    url: String,
    headers: BTreeMap<String, String>,
    timeout_secs: u64,
}

impl HttpTransportBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_secs: 30,
        }
    }

    /// Add a custom header to all requests
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the request timeout in seconds (default: 30)
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<HttpTransport, McpError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| McpError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpTransport {
            url: self.url,
            client,
            headers: self.headers,
            session_id: None,
            connected: true,
            responses: VecDeque::new(),
        })
    }
}

/// Extract the JSON-RPC payload from a response body.
///
/// SSE bodies (`event:`/`data:` lines) yield the last `data:` payload; an
/// empty body (e.g. `202 Accepted` for notifications) yields `None`.
fn extract_payload(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed.to_string());
    }

    let mut last = None;
    let mut current = String::new();
    for line in trimmed.lines() {
        if let Some(data) = line.strip_prefix("data:") {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(data.trim_start());
        } else if line.trim().is_empty() && !current.is_empty() {
            last = Some(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        last = Some(current);
    }
    last
}

#[async_trait]
impl super::Transport for HttpTransport {
    async fn send(&mut self, message: &str) -> Result<(), McpError> {
        if !self.connected {
            return Err(McpError::transport("HTTP transport is closed"));
        }
        trace!(url = %self.url, message = %message, "MCP HTTP send");

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json, text/event-stream");

        if let Some(ref session) = self.session_id {
            request = request.header(SESSION_HEADER, session);
        }
        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request
            .body(message.to_string())
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!(
                "HTTP error {}: {}",
                status, body
            )));
        }

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            if self.session_id.as_deref() != Some(session) {
                debug!(url = %self.url, session_id = %session, "MCP HTTP session established");
                self.session_id = Some(session.to_string());
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| McpError::Transport(format!("Failed to read response: {}", e)))?;

        trace!(url = %self.url, body = %body, "MCP HTTP response");

        if let Some(payload) = extract_payload(&body) {
            self.responses.push_back(payload);
        }

        Ok(())
    }

    async fn receive(&mut self) -> Result<String, McpError> {
        self.responses
            .pop_front()
            .ok_or_else(|| McpError::transport("No response available - call send() first"))
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.connected = false;
        self.responses.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("session_id", &self.session_id)
            .field("connected", &self.connected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Transport;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_builder_with_headers() {
        let transport = HttpTransport::new("https://example.com/mcp")
            .with_header("Authorization", "Bearer test-token")
            .with_headers([("X-Custom", "value")])
            .with_timeout_secs(60)
            .build()
            .unwrap();

        assert_eq!(transport.url(), "https://example.com/mcp");
        assert!(transport.is_connected());
        assert_eq!(transport.headers.len(), 2);
    }

    #[test]
    fn test_debug_hides_header_values() {
        let transport = HttpTransport::new("https://example.com/mcp")
            .with_header("Authorization", "secret")
            .build()
            .unwrap();

        let debug_str = format!("{:?}", transport);
        assert!(debug_str.contains("Authorization"));
        assert!(!debug_str.contains("secret"));
    }

    #[test]
    fn test_extract_payload_variants() {
        assert_eq!(extract_payload("  "), None);
        assert_eq!(
            extract_payload(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#).as_deref(),
            Some(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#)
        );
        let sse = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":3,\"result\":{}}\n\n";
        assert_eq!(
            extract_payload(sse).as_deref(),
            Some(r#"{"jsonrpc":"2.0","id":3,"result":{}}"#)
        );
    }

    #[tokio::test]
    async fn test_session_header_is_echoed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .and(header(SESSION_HEADER, "abc-123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[]}}"#),
            )
            .with_priority(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/mcp"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(SESSION_HEADER, "abc-123")
                    .set_body_string(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#),
            )
            .mount(&server)
            .await;

        let mut transport = HttpTransport::new(format!("{}/mcp", server.uri()))
            .build()
            .unwrap();

        transport.send(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#).await.unwrap();
        assert_eq!(transport.session_id(), Some("abc-123"));
        assert!(transport.receive().await.unwrap().contains("\"id\":1"));

        transport.send(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await.unwrap();
        assert!(transport.receive().await.unwrap().contains("tools"));
    }

    #[tokio::test]
    async fn test_http_error_status_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut transport = HttpTransport::new(server.uri()).build().unwrap();
        let err = transport.send("{}").await.unwrap_err();
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("boom"));
    }
}
