//! JSON-RPC 2.0 client for the tool-call search service.
//!
//! One request per call, no pipelining. Request ids come from a counter seeded
//! with the current Unix time in milliseconds, so ids stay unique across
//! process restarts as well as within one process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use aiscout_shared::{AiScoutError, McpConfig, Result};

/// JSON-RPC protocol version tag.
const JSONRPC_VERSION: &str = "2.0";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

/// The `error` member of a JSON-RPC response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// One block of a tool result's `content` array.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// The `result` of a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Text of the first content block that carries any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|b| b.text.as_deref())
    }
}

/// A tool advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<ToolInfo>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP POST transport for JSON-RPC tool calls.
pub struct McpClient {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    next_id: AtomicU64,
}

impl McpClient {
    /// Build a client for the configured endpoint.
    pub fn new(config: &McpConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            AiScoutError::config(format!("invalid MCP endpoint '{}': {e}", config.endpoint))
        })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AiScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        let seed = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(1);

        Ok(Self {
            client,
            endpoint,
            timeout,
            next_id: AtomicU64::new(seed),
        })
    }

    /// The endpoint requests are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Per-request time limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send one JSON-RPC request and return its `result` member.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_request_id();
        let envelope = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        };

        debug!(id, method, endpoint = %self.endpoint, "sending JSON-RPC request");

        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&envelope)
            .send()
            .await
            .map_err(|e| AiScoutError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiScoutError::Network(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AiScoutError::Network(format!("{}: body read failed: {e}", self.endpoint)))?;

        let reply: JsonRpcResponse = serde_json::from_str(&body).map_err(|e| {
            AiScoutError::protocol(
                None,
                format!(
                    "malformed JSON-RPC response: {e} (got: {})",
                    body.chars().take(200).collect::<String>()
                ),
            )
        })?;

        if let Some(err) = reply.error {
            return Err(AiScoutError::protocol(Some(err.code), err.message));
        }

        if let Some(reply_id) = &reply.id {
            if reply_id.as_u64() != Some(id) {
                return Err(AiScoutError::protocol(
                    None,
                    format!("response id {reply_id} does not match request id {id}"),
                ));
            }
        }

        reply
            .result
            .ok_or_else(|| AiScoutError::protocol(None, "response has neither result nor error"))
    }

    /// Invoke a named tool with the given arguments object.
    #[instrument(skip(self, arguments))]
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let result = self
            .request(
                "tools/call",
                Some(json!({ "name": name, "arguments": arguments })),
            )
            .await?;

        let parsed: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| AiScoutError::protocol(None, format!("malformed tool result: {e}")))?;

        if parsed.is_error {
            let message = parsed.first_text().unwrap_or("tool reported an error");
            return Err(AiScoutError::protocol(None, message.to_string()));
        }

        Ok(parsed)
    }

    /// List the tools the server advertises.
    #[instrument(skip(self))]
    pub async fn list_tools(&self) -> Result<Vec<ToolInfo>> {
        let result = self.request("tools/list", Some(json!({}))).await?;
        let parsed: ToolsListResult = serde_json::from_value(result)
            .map_err(|e| AiScoutError::protocol(None, format!("malformed tools/list result: {e}")))?;
        Ok(parsed.tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn client_for(server: &MockServer) -> McpClient {
        let config = McpConfig {
            endpoint: format!("{}/messages", server.uri()),
            timeout_secs: 2,
            ..McpConfig::default()
        };
        McpClient::new(&config).unwrap()
    }

    /// Echo the request id back inside a canned result.
    fn echo_result(result: Value) -> impl Fn(&Request) -> ResponseTemplate {
        move |req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "result": result.clone(),
            }))
        }
    }

    #[test]
    fn request_ids_are_unique_and_increasing() {
        let client = McpClient::new(&McpConfig::default()).unwrap();
        let a = client.next_request_id();
        let b = client.next_request_id();
        assert!(b > a);
        assert!(a > 1_600_000_000_000, "seeded from wall clock millis");
    }

    #[tokio::test]
    async fn call_tool_sends_jsonrpc_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({
                "jsonrpc": "2.0",
                "method": "tools/call",
                "params": { "name": "search_ai_jobs", "arguments": { "keyword": "LLM" } }
            })))
            .respond_with(echo_result(json!({
                "content": [{ "type": "text", "text": "[]" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .call_tool("search_ai_jobs", json!({ "keyword": "LLM" }))
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("[]"));
    }

    #[tokio::test]
    async fn jsonrpc_error_becomes_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "Unknown tool" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .call_tool("nope", json!({}))
            .await
            .unwrap_err();
        match err {
            AiScoutError::Protocol { code, message } => {
                assert_eq!(code, Some(-32601));
                assert_eq!(message, "Unknown tool");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_level_error_flag_is_a_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(echo_result(json!({
                "isError": true,
                "content": [{ "type": "text", "text": "rate limited" }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .call_tool("search_activities", json!({ "keyword": "AI" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn http_failure_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client_for(&server).list_tools().await.unwrap_err();
        assert!(matches!(err, AiScoutError::Network(_)));
    }

    #[tokio::test]
    async fn list_tools_parses_descriptors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "tools/list" })))
            .respond_with(echo_result(json!({
                "tools": [
                    { "name": "search_ai_jobs", "description": "Find AI jobs",
                      "inputSchema": { "type": "object" } },
                    { "name": "search_activities" }
                ]
            })))
            .mount(&server)
            .await;

        let tools = client_for(&server).list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].description.as_deref(), Some("Find AI jobs"));
        assert!(tools[1].input_schema.is_none());
    }
}
