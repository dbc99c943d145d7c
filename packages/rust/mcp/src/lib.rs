//! Client for the external tool-call search service (JSON-RPC 2.0 over HTTP).
//!
//! - [`client`]: envelope types and the [`McpClient`] transport
//! - [`search`]: [`McpSearchAdapter`], which maps a category to a tool and
//!   turns the reply into raw listings

pub mod client;
pub mod search;

pub use client::{ContentBlock, JsonRpcError, McpClient, ToolCallResult, ToolInfo};
pub use search::{McpSearch, McpSearchAdapter, ToolPayload, parse_tool_text, tool_source_name};
