//! Shared types, error model, and configuration for aiscout.
//!
//! This crate is the foundation depended on by all other aiscout crates.
//! It provides:
//! - [`AiScoutError`]: the unified error type
//! - Domain types ([`Opportunity`], [`RawListing`], [`CrawlResult`])
//! - Source descriptors ([`SourceDescriptor`]) and the bundled source table
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod sources;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BROWSER_USER_AGENT, CrawlConfig, DEFAULT_TOOL_CATEGORY, DefaultsConfig, McpConfig,
    RelevanceConfig, ToolArgument, ToolBinding, config_dir, config_file_path, default_keywords,
    default_tool_map, init_config, load_config, load_config_from,
};
pub use error::{AiScoutError, FailureKind, Result};
pub use sources::{
    ExtractionRules, FieldRules, KEYWORD_PLACEHOLDER, SourceDescriptor, SourceFormat,
    default_sources, parse_sources, split_field_rule,
};
pub use types::{
    CrawlResult, ListingField, Opportunity, OpportunityType, RawListing, ScrapedListing,
    SourceStatus, ToolListing,
};
