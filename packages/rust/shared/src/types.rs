//! Core domain types: canonical opportunities, raw listings, and crawl results.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::FailureKind;

// ---------------------------------------------------------------------------
// OpportunityType
// ---------------------------------------------------------------------------

/// The three listing kinds the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityType {
    Job,
    Contest,
    Event,
}

impl OpportunityType {
    pub const ALL: [OpportunityType; 3] = [Self::Job, Self::Contest, Self::Event];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Job => "job",
            Self::Contest => "contest",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OpportunityType {
    type Err = String;

    /// Accepts the canonical tags plus the Korean labels upstream sources use.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "job" | "jobs" | "채용" | "구인" => Ok(Self::Job),
            "contest" | "contests" | "공모전" | "대회" | "해커톤" => Ok(Self::Contest),
            "event" | "events" | "행사" | "세미나" | "컨퍼런스" | "밋업" => Ok(Self::Event),
            other => Err(format!("unknown opportunity type '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// Canonical normalized record for one job/contest/event listing.
///
/// `title` is never empty and `link` is always an absolute URL; the
/// normalization step drops records that cannot satisfy both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OpportunityType,
    /// Deadline or event date; `None` when the source gave nothing parseable.
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Canonical link: the official external link when present, else the detail page.
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_link: Option<String>,
    /// The source's own detail page, kept for provenance.
    pub source_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_prize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_tags: Option<Vec<String>>,
    /// Name of the source this record came from.
    pub source: String,
    /// Keyword relevance score (title hits weigh double).
    #[serde(default)]
    pub relevance_score: u32,
}

// ---------------------------------------------------------------------------
// RawListing
// ---------------------------------------------------------------------------

/// A named field a source can extract for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingField {
    Title,
    Description,
    Link,
    OfficialLink,
    Date,
    StartDate,
    Thumbnail,
    Company,
    Sponsor,
    Location,
    Prize,
    TotalPrize,
    FirstPrize,
    Salary,
    ApplicationTarget,
    Category,
}

/// Source-specific intermediate parse result, prior to normalization.
#[derive(Debug, Clone)]
pub enum RawListing {
    /// Extracted by a descriptor-driven site adapter (HTML or JSON API).
    Scraped(ScrapedListing),
    /// One item returned by the external tool-call search service.
    Tool(ToolListing),
}

impl RawListing {
    /// Name of the source that produced this listing.
    pub fn source(&self) -> &str {
        match self {
            Self::Scraped(l) => &l.source,
            Self::Tool(l) => &l.source,
        }
    }
}

/// Field strings lifted from one listing on a scraped page.
#[derive(Debug, Clone)]
pub struct ScrapedListing {
    pub source: String,
    pub item_type: OpportunityType,
    /// Relative links resolve against this.
    pub base_url: Url,
    /// The page (or API response) the listing was found on.
    pub page_url: Url,
    /// Trimmed, whitespace-collapsed, non-empty values only.
    pub fields: BTreeMap<ListingField, String>,
}

impl ScrapedListing {
    pub fn get(&self, field: ListingField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }
}

/// One JSON item from a tool-call response.
#[derive(Debug, Clone)]
pub struct ToolListing {
    pub source: String,
    /// Category the search was issued for (e.g. `job`, `contest`).
    pub category: String,
    /// Type to assume when the item does not declare one.
    pub fallback_type: Option<OpportunityType>,
    pub item: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Crawl results
// ---------------------------------------------------------------------------

/// Outcome of one source within a crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Ok { items: usize },
    Failed { kind: FailureKind, reason: String },
}

impl SourceStatus {
    pub fn failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

/// Aggregate output of one orchestrator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub items: Vec<Opportunity>,
    pub items_found: usize,
    /// `false` only for an orchestrator-level defect, never for source outages.
    pub success: bool,
    pub per_source_status: BTreeMap<String, SourceStatus>,
    /// Records discarded by validation (missing title, link, or type).
    #[serde(default)]
    pub items_dropped: usize,
}

impl CrawlResult {
    /// Number of sources that reported a failure.
    pub fn failed_sources(&self) -> usize {
        self.per_source_status
            .values()
            .filter(|s| !s.is_ok())
            .count()
    }

    /// Stable sort by relevance, highest first.
    pub fn sort_by_relevance(&mut self) {
        self.items
            .sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
    }
}
