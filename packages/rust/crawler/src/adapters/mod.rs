//! Listing parser trait and the built-in body parsers.
//!
//! A parser applies one [`ExtractionRules`] set to a response body. Site
//! specifics live entirely in the rules, so the same two parsers serve every
//! configured source.

mod html;
mod json;

use std::collections::BTreeMap;

use aiscout_shared::{ExtractionRules, ListingField, Result, SourceFormat};

pub use html::HtmlListParser;
pub use json::JsonListParser;

/// Field values lifted from one listing.
pub type ExtractedFields = BTreeMap<ListingField, String>;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Trait for format-specific listing extraction.
pub trait ListingParser: Send + Sync {
    /// Apply one rule set to `body`.
    ///
    /// Returns only listings that yielded a non-empty title. `Ok(vec![])` means
    /// the rules matched nothing; `Err` means the body itself is unusable.
    fn extract(&self, body: &str, rules: &ExtractionRules) -> Result<Vec<ExtractedFields>>;

    /// Human-readable parser name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds one parser per supported body format.
pub struct ParserRegistry {
    html: Box<dyn ListingParser>,
    json: Box<dyn ListingParser>,
}

impl ParserRegistry {
    /// Create a registry with the built-in parsers.
    pub fn new() -> Self {
        Self {
            html: Box::new(HtmlListParser),
            json: Box::new(JsonListParser),
        }
    }

    /// The parser for a source's body format.
    pub fn for_format(&self, format: SourceFormat) -> &dyn ListingParser {
        match format {
            SourceFormat::Html => self.html.as_ref(),
            SourceFormat::Json => self.json.as_ref(),
        }
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Collapse runs of whitespace and trim.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Insert `value` under `field` unless it is empty after whitespace collapsing.
pub(crate) fn insert_field(fields: &mut ExtractedFields, field: ListingField, value: &str) {
    let value = collapse_whitespace(value);
    if !value.is_empty() {
        fields.insert(field, value);
    }
}
