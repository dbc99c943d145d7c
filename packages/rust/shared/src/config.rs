//! Application configuration for aiscout.
//!
//! User config lives at `~/.aiscout/aiscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AiScoutError, Result};
use crate::sources::{SourceDescriptor, default_sources};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "aiscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".aiscout";

/// Default database file name inside the config directory.
const DATABASE_FILE_NAME: &str = "aiscout.db";

/// Desktop browser User-Agent; several listing sites reject library defaults.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching aiscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Tool-call search service settings.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Keyword corpus for relevance scoring.
    #[serde(default)]
    pub relevance: RelevanceConfig,

    /// Listing sources. Empty means the bundled table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDescriptor>,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum concurrent source fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-source request timeout.
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    /// Ceiling for one whole crawl call.
    #[serde(default = "default_crawl_timeout")]
    pub crawl_timeout_secs: u64,

    /// User-Agent header sent to every source.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Path of the pending-item database. Defaults to `~/.aiscout/aiscout.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            source_timeout_secs: default_source_timeout(),
            crawl_timeout_secs: default_crawl_timeout(),
            user_agent: default_user_agent(),
            database_path: None,
        }
    }
}

fn default_concurrency() -> u32 {
    4
}
fn default_source_timeout() -> u64 {
    8
}
fn default_crawl_timeout() -> u64 {
    30
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

/// Argument shape a search tool expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolArgument {
    Keyword,
    Style,
    Purpose,
}

impl ToolArgument {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Style => "style",
            Self::Purpose => "purpose",
        }
    }
}

/// One `[mcp.tools.<category>]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolBinding {
    /// Tool name passed in `params.name`.
    pub name: String,
    /// Which argument key carries the query text.
    pub argument: ToolArgument,
}

impl ToolBinding {
    fn new(name: &str, argument: ToolArgument) -> Self {
        Self {
            name: name.into(),
            argument,
        }
    }
}

/// Category key used when no specific binding matches.
pub const DEFAULT_TOOL_CATEGORY: &str = "default";

/// `[mcp]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Whether keyword crawls also query the search service.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSON-RPC endpoint (`POST`).
    #[serde(default = "default_mcp_endpoint")]
    pub endpoint: String,

    /// Request timeout.
    #[serde(default = "default_mcp_timeout")]
    pub timeout_secs: u64,

    /// Category → tool binding.
    #[serde(default = "default_tool_map")]
    pub tools: BTreeMap<String, ToolBinding>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_mcp_endpoint(),
            timeout_secs: default_mcp_timeout(),
            tools: default_tool_map(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_mcp_endpoint() -> String {
    "http://localhost:3001/messages".into()
}
fn default_mcp_timeout() -> u64 {
    10
}

/// The stock category → tool map.
pub fn default_tool_map() -> BTreeMap<String, ToolBinding> {
    BTreeMap::from([
        ("job".into(), ToolBinding::new("search_ai_jobs", ToolArgument::Keyword)),
        ("trend".into(), ToolBinding::new("get_ai_trends", ToolArgument::Keyword)),
        ("recipe".into(), ToolBinding::new("search_ai_recipes", ToolArgument::Style)),
        ("tool".into(), ToolBinding::new("recommend_ai_tools", ToolArgument::Purpose)),
        (
            DEFAULT_TOOL_CATEGORY.into(),
            ToolBinding::new("search_activities", ToolArgument::Keyword),
        ),
    ])
}

/// `[relevance]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceConfig {
    /// Domain vocabulary matched case-insensitively as substrings.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
        }
    }
}

/// The stock AI keyword corpus.
pub fn default_keywords() -> Vec<String> {
    [
        "AI",
        "인공지능",
        "생성형",
        "프롬프트",
        "LLM",
        "GPT",
        "ChatGPT",
        "머신러닝",
        "딥러닝",
        "machine learning",
        "deep learning",
        "챗봇",
        "자연어",
        "NLP",
        "컴퓨터 비전",
        "Midjourney",
        "Stable Diffusion",
        "미드저니",
        "에이전트",
        "데이터 사이언스",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Crawl config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum concurrent source fetches.
    pub concurrency: u32,
    /// Default per-source timeout.
    pub source_timeout: Duration,
    /// Ceiling for one whole crawl call.
    pub crawl_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.concurrency.max(1),
            source_timeout: Duration::from_secs(config.defaults.source_timeout_secs),
            crawl_timeout: Duration::from_secs(config.defaults.crawl_timeout_secs),
            user_agent: config.defaults.user_agent.clone(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl AppConfig {
    /// Configured sources, or the bundled table when none are declared.
    pub fn effective_sources(&self) -> Vec<SourceDescriptor> {
        if self.sources.is_empty() {
            default_sources()
        } else {
            self.sources.clone()
        }
    }

    /// Resolved database path.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.defaults.database_path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(config_dir()?.join(DATABASE_FILE_NAME)),
        }
    }

    /// Validate the parts serde cannot: source descriptors, names, and the tool map.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.name.as_str()) {
                return Err(AiScoutError::config(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
        }
        if self.mcp.enabled && !self.mcp.tools.contains_key(DEFAULT_TOOL_CATEGORY) {
            return Err(AiScoutError::config(format!(
                "[mcp.tools] must define a '{DEFAULT_TOOL_CATEGORY}' entry"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.aiscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AiScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.aiscout/aiscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AiScoutError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| AiScoutError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AiScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AiScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AiScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("source_timeout_secs"));
        assert!(toml_str.contains("search_activities"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.concurrency, 4);
        assert_eq!(parsed.mcp.tools, default_tool_map());
        assert!(parsed.relevance.keywords.iter().any(|k| k == "AI"));
    }

    #[test]
    fn config_with_tool_override() {
        let toml_str = r#"
[defaults]
concurrency = 2

[mcp]
endpoint = "http://mcp.internal:9000/messages"

[mcp.tools.default]
name = "search_everything"
argument = "keyword"

[mcp.tools.tool]
name = "recommend_ai_tools"
argument = "purpose"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        config.validate().expect("valid");
        assert_eq!(config.defaults.concurrency, 2);
        assert_eq!(config.defaults.source_timeout_secs, 8);
        assert_eq!(config.mcp.tools.len(), 2);
        assert_eq!(config.mcp.tools["default"].name, "search_everything");
        assert_eq!(config.mcp.tools["tool"].argument, ToolArgument::Purpose);
    }

    #[test]
    fn tool_map_without_default_is_rejected() {
        let toml_str = r#"
[mcp.tools.job]
name = "search_ai_jobs"
argument = "keyword"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default"));
    }

    #[test]
    fn empty_sources_fall_back_to_bundled_table() {
        let config = AppConfig::default();
        assert!(!config.effective_sources().is_empty());
    }

    #[test]
    fn crawl_config_from_app_config() {
        let app = AppConfig::default();
        let crawl = CrawlConfig::from(&app);
        assert_eq!(crawl.concurrency, 4);
        assert_eq!(crawl.source_timeout, Duration::from_secs(8));
        assert_eq!(crawl.crawl_timeout, Duration::from_secs(30));
        assert!(crawl.user_agent.starts_with("Mozilla/5.0"));
    }
}
