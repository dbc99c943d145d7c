//! Source descriptors: per-site fetch and extraction rules expressed as data.
//!
//! Every site adapter runs the same control flow; only the descriptor differs.
//! The bundled table lives in `assets/sources.toml` and is used whenever the
//! user config does not declare its own `[[sources]]`.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AiScoutError, Result};
use crate::types::{ListingField, OpportunityType};

/// Bundled default source table.
const DEFAULT_SOURCES_TOML: &str = include_str!("../assets/sources.toml");

/// Placeholder substituted with the URL-encoded search keyword.
pub const KEYWORD_PLACEHOLDER: &str = "{keyword}";

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Response body format a source serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Html,
    Json,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

/// Static configuration for one external listing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique source name (used as the status key).
    pub name: String,
    /// Listing kind this source produces.
    pub item_type: OpportunityType,
    /// Body format: `html` (CSS selectors) or `json` (JSON pointers).
    pub format: SourceFormat,
    /// Base URL relative links resolve against.
    pub base_url: String,
    /// Listing page fetched on an unscoped crawl.
    pub url: String,
    /// Search page template containing `{keyword}`; used when a keyword is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_url: Option<String>,
    /// Per-source timeout override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Disabled sources are never dispatched.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Extraction rules: the first set is primary, the rest are fallbacks in order.
    pub rules: Vec<ExtractionRules>,
}

fn default_true() -> bool {
    true
}

/// One selector set: how to find listings and lift fields out of each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// HTML: CSS selector matching one listing. JSON: pointer to the listing array.
    pub item: String,
    pub fields: FieldRules,
}

/// Per-field extraction rules.
///
/// HTML rules are `"css selector"` (element text) or `"css selector@attr"`
/// (attribute value); `"@attr"` alone reads the listing element itself.
/// JSON rules are pointers relative to one listing (e.g. `"/company/name"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRules {
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl FieldRules {
    /// All configured `(field, rule)` pairs.
    pub fn entries(&self) -> Vec<(ListingField, &str)> {
        [
            (ListingField::Title, &self.title),
            (ListingField::Description, &self.description),
            (ListingField::Link, &self.link),
            (ListingField::OfficialLink, &self.official_link),
            (ListingField::Date, &self.date),
            (ListingField::StartDate, &self.start_date),
            (ListingField::Thumbnail, &self.thumbnail),
            (ListingField::Company, &self.company),
            (ListingField::Sponsor, &self.sponsor),
            (ListingField::Location, &self.location),
            (ListingField::Prize, &self.prize),
            (ListingField::TotalPrize, &self.total_prize),
            (ListingField::FirstPrize, &self.first_prize),
            (ListingField::Salary, &self.salary),
            (ListingField::ApplicationTarget, &self.application_target),
            (ListingField::Category, &self.category),
        ]
        .into_iter()
        .filter_map(|(field, rule)| rule.as_deref().map(|r| (field, r)))
        .collect()
    }
}

/// Split an HTML field rule into its CSS selector and optional attribute name.
///
/// Only a trailing `@name` made of attribute-name characters counts, so
/// selectors like `a[href*="@"]` are left intact.
pub fn split_field_rule(rule: &str) -> (&str, Option<&str>) {
    if let Some((selector, attr)) = rule.rsplit_once('@') {
        let is_attr = !attr.is_empty()
            && attr
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if is_attr {
            return (selector.trim(), Some(attr));
        }
    }
    (rule.trim(), None)
}

impl SourceDescriptor {
    /// The URL to fetch, substituting the keyword into `search_url` when both are present.
    pub fn request_url(&self, keyword: Option<&str>) -> String {
        match (keyword, &self.search_url) {
            (Some(kw), Some(template)) if !kw.trim().is_empty() => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(kw.trim().as_bytes()).collect();
                template.replace(KEYWORD_PLACEHOLDER, &encoded)
            }
            _ => self.url.clone(),
        }
    }

    /// Check the descriptor is usable: absolute URLs, at least one rule set,
    /// a title rule in every set, and (for HTML) compilable selectors.
    pub fn validate(&self) -> Result<()> {
        let ctx = |msg: String| AiScoutError::config(format!("source '{}': {msg}", self.name));

        if self.name.trim().is_empty() {
            return Err(AiScoutError::config("source with empty name"));
        }

        for (label, raw) in [("base_url", Some(&self.base_url)), ("url", Some(&self.url))]
            .into_iter()
            .chain(std::iter::once(("search_url", self.search_url.as_ref())))
        {
            let Some(raw) = raw else { continue };
            let probe = raw.replace(KEYWORD_PLACEHOLDER, "x");
            Url::parse(&probe).map_err(|e| ctx(format!("invalid {label} '{raw}': {e}")))?;
        }

        if let Some(template) = &self.search_url {
            if !template.contains(KEYWORD_PLACEHOLDER) {
                return Err(ctx(format!("search_url lacks {KEYWORD_PLACEHOLDER}")));
            }
        }

        if self.rules.is_empty() {
            return Err(ctx("no extraction rules".into()));
        }

        for (idx, rules) in self.rules.iter().enumerate() {
            if rules.fields.title.is_none() {
                return Err(ctx(format!("rule set {idx} has no title rule")));
            }
            if self.format == SourceFormat::Html {
                Selector::parse(&rules.item)
                    .map_err(|e| ctx(format!("rule set {idx}: bad item selector: {e:?}")))?;
                for (field, rule) in rules.fields.entries() {
                    let (selector, _) = split_field_rule(rule);
                    if selector.is_empty() {
                        continue;
                    }
                    Selector::parse(selector).map_err(|e| {
                        ctx(format!("rule set {idx}: bad {field:?} selector: {e:?}"))
                    })?;
                }
            } else if !(rules.item.is_empty() || rules.item.starts_with('/')) {
                return Err(ctx(format!(
                    "rule set {idx}: item must be a JSON pointer, got '{}'",
                    rules.item
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bundled defaults
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SourceTable {
    sources: Vec<SourceDescriptor>,
}

/// Parse a `[[sources]]` TOML document.
pub fn parse_sources(toml_str: &str) -> Result<Vec<SourceDescriptor>> {
    let table: SourceTable = toml::from_str(toml_str)
        .map_err(|e| AiScoutError::config(format!("failed to parse source table: {e}")))?;
    for source in &table.sources {
        source.validate()?;
    }
    Ok(table.sources)
}

/// The bundled default source table.
pub fn default_sources() -> Vec<SourceDescriptor> {
    parse_sources(DEFAULT_SOURCES_TOML).unwrap_or_else(|e| {
        tracing::error!(error = %e, "bundled source table is invalid");
        Vec::new()
    })
}
