//! Category-routed search over the tool-call service.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use aiscout_shared::{
    AiScoutError, DEFAULT_TOOL_CATEGORY, OpportunityType, RawListing, Result, SourceStatus,
    ToolBinding, ToolListing,
};

use crate::client::{McpClient, ToolInfo};

/// Object keys that may wrap the result array.
const WRAPPER_KEYS: [&str; 3] = ["items", "results", "data"];

/// Longest diagnostic text kept from an unstructured reply.
const MAX_DIAGNOSTIC_CHARS: usize = 300;

/// Status-map key for a tool source.
pub fn tool_source_name(tool: &str) -> String {
    format!("mcp:{tool}")
}

/// Decoded `content[0].text` of a tool reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolPayload {
    /// Structured result items.
    Items(Vec<Value>),
    /// Free text the server returned instead of JSON.
    Unstructured(String),
}

/// Decode tool reply text.
///
/// A JSON array is the item list. An object carrying an array under one of
/// `items`, `results` or `data` is unwrapped. Any other JSON is a protocol
/// error. Text that is not JSON at all is kept as a diagnostic.
pub fn parse_tool_text(text: &str) -> Result<ToolPayload> {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            let diagnostic: String = text.trim().chars().take(MAX_DIAGNOSTIC_CHARS).collect();
            return Ok(ToolPayload::Unstructured(diagnostic));
        }
    };

    match value {
        Value::Array(items) => Ok(ToolPayload::Items(items)),
        Value::Object(mut obj) => match take_wrapped_array(&mut obj) {
            Some(items) => Ok(ToolPayload::Items(items)),
            None => Err(AiScoutError::protocol(
                None,
                "tool result is a JSON object without an item array",
            )),
        },
        other => Err(AiScoutError::protocol(
            None,
            format!("tool result is JSON {} rather than a list", json_kind(&other)),
        )),
    }
}

fn take_wrapped_array(obj: &mut Map<String, Value>) -> Option<Vec<Value>> {
    WRAPPER_KEYS.iter().find_map(|key| match obj.remove(*key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Outcome of one tool search. Failures are carried in `status`.
#[derive(Debug, Clone)]
pub struct McpSearch {
    /// `mcp:<tool>` key for the status map.
    pub source: String,
    pub listings: Vec<RawListing>,
    pub status: SourceStatus,
    /// Server text that was not structured JSON.
    pub diagnostic: Option<String>,
    pub elapsed: Duration,
}

/// Tool-call search adapter: routes a category to its bound tool.
pub struct McpSearchAdapter {
    client: McpClient,
    tools: BTreeMap<String, ToolBinding>,
}

impl McpSearchAdapter {
    pub fn new(client: McpClient, tools: BTreeMap<String, ToolBinding>) -> Self {
        Self { client, tools }
    }

    pub fn client(&self) -> &McpClient {
        &self.client
    }

    /// Binding for `category`, falling back to the `default` entry.
    pub fn binding_for(&self, category: &str) -> Option<&ToolBinding> {
        self.tools
            .get(category)
            .or_else(|| self.tools.get(DEFAULT_TOOL_CATEGORY))
    }

    /// Status key the search for `category` will report under.
    pub fn source_name_for(&self, category: &str) -> String {
        match self.binding_for(category) {
            Some(binding) => tool_source_name(&binding.name),
            None => tool_source_name(category),
        }
    }

    /// Search `category` for `query`. Never fails: errors become a failed status.
    #[instrument(skip(self, fallback_type))]
    pub async fn search(
        &self,
        category: &str,
        query: &str,
        fallback_type: Option<OpportunityType>,
    ) -> McpSearch {
        let start = Instant::now();
        let source = self.source_name_for(category);

        let outcome = match self.binding_for(category) {
            Some(binding) => self.try_search(binding, query).await,
            None => Err(AiScoutError::config(format!(
                "no tool bound for category '{category}' and no '{DEFAULT_TOOL_CATEGORY}' entry"
            ))),
        };
        let elapsed = start.elapsed();

        match outcome {
            Ok(ToolPayload::Items(items)) => {
                debug!(items = items.len(), elapsed_ms = elapsed.as_millis(), "tool search done");
                let listings: Vec<RawListing> = items
                    .into_iter()
                    .map(|item| {
                        RawListing::Tool(ToolListing {
                            source: source.clone(),
                            category: category.to_string(),
                            fallback_type,
                            item,
                        })
                    })
                    .collect();
                McpSearch {
                    status: SourceStatus::Ok {
                        items: listings.len(),
                    },
                    source,
                    listings,
                    diagnostic: None,
                    elapsed,
                }
            }
            Ok(ToolPayload::Unstructured(text)) => {
                debug!(diagnostic = %text, "tool replied with unstructured text");
                McpSearch {
                    source,
                    listings: Vec::new(),
                    status: SourceStatus::Ok { items: 0 },
                    diagnostic: Some(text),
                    elapsed,
                }
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = elapsed.as_millis(), "tool search failed");
                McpSearch {
                    source,
                    listings: Vec::new(),
                    status: SourceStatus::failed(e.failure_kind(), e.to_string()),
                    diagnostic: None,
                    elapsed,
                }
            }
        }
    }

    async fn try_search(&self, binding: &ToolBinding, query: &str) -> Result<ToolPayload> {
        let mut arguments = Map::new();
        arguments.insert(
            binding.argument.as_str().to_string(),
            Value::String(query.to_string()),
        );

        let result = self
            .client
            .call_tool(&binding.name, Value::Object(arguments))
            .await?;

        match result.first_text() {
            Some(text) => parse_tool_text(text),
            None => Ok(ToolPayload::Unstructured("tool returned no text content".into())),
        }
    }

    /// Names in the tool map the server does not advertise.
    pub async fn validate_tool_map(&self) -> Result<Vec<String>> {
        let advertised = self.client.list_tools().await?;
        Ok(self.missing_tools(&advertised))
    }

    /// Bound tool names absent from `advertised`, sorted and deduplicated.
    pub fn missing_tools(&self, advertised: &[ToolInfo]) -> Vec<String> {
        let mut missing: Vec<String> = self
            .tools
            .values()
            .filter(|b| !advertised.iter().any(|t| t.name == b.name))
            .map(|b| b.name.clone())
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}
