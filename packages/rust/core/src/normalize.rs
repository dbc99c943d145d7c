//! Raw listing → canonical [`Opportunity`].
//!
//! Normalization is pure: the only inputs besides the listing are the crawl
//! date (for relative deadlines) and the relevance scorer. A listing that
//! cannot produce a title, an absolute link and a type fails with
//! [`AiScoutError::Validation`]; every other field is best-effort.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use url::Url;

use aiscout_shared::{
    AiScoutError, ListingField, Opportunity, OpportunityType, RawListing, Result,
    ScrapedListing, ToolListing,
};

use crate::dates::{DateRange, parse_date, parse_date_range};
use crate::relevance::RelevanceScorer;

/// Characters that separate entries in a category string.
const TAG_SEPARATORS: &[char] = &[',', '#', '/', '·', '|'];

/// Normalizes raw listings for one crawl.
pub struct NormalizationEngine<'a> {
    today: NaiveDate,
    scorer: &'a RelevanceScorer,
}

impl<'a> NormalizationEngine<'a> {
    pub fn new(today: NaiveDate, scorer: &'a RelevanceScorer) -> Self {
        Self { today, scorer }
    }

    pub fn normalize(&self, raw: &RawListing) -> Result<Opportunity> {
        let mut opp = match raw {
            RawListing::Scraped(listing) => self.normalize_scraped(listing)?,
            RawListing::Tool(listing) => self.normalize_tool(listing)?,
        };
        opp.relevance_score = self.scorer.score(&opp.title, &opp.description);
        Ok(opp)
    }

    fn normalize_scraped(&self, listing: &ScrapedListing) -> Result<Opportunity> {
        let field = |f: ListingField| listing.get(f).map(str::to_string);

        let title = field(ListingField::Title)
            .ok_or_else(|| AiScoutError::validation(format!("{}: listing has no title", listing.source)))?;

        let detail = listing
            .get(ListingField::Link)
            .and_then(|raw| resolve_link(&listing.base_url, raw));
        let official = listing
            .get(ListingField::OfficialLink)
            .and_then(|raw| resolve_link(&listing.base_url, raw));

        let link = official.clone().or_else(|| detail.clone()).ok_or_else(|| {
            AiScoutError::validation(format!("{}: '{title}' has no resolvable link", listing.source))
        })?;
        let source_link = detail.unwrap_or_else(|| listing.page_url.to_string());

        let dates = listing
            .get(ListingField::Date)
            .map(|text| parse_date_range(text, self.today))
            .unwrap_or_default();
        let start_date = listing
            .get(ListingField::StartDate)
            .and_then(|text| parse_date(text, self.today))
            .or(dates.start);

        Ok(Opportunity {
            title,
            description: field(ListingField::Description).unwrap_or_default(),
            kind: listing.item_type,
            date: dates.end,
            company: field(ListingField::Company),
            link,
            official_link: official,
            source_link,
            thumbnail: listing
                .get(ListingField::Thumbnail)
                .and_then(|raw| resolve_link(&listing.base_url, raw)),
            location: field(ListingField::Location),
            prize: field(ListingField::Prize),
            salary: field(ListingField::Salary),
            application_target: field(ListingField::ApplicationTarget),
            sponsor: field(ListingField::Sponsor),
            total_prize: field(ListingField::TotalPrize),
            first_prize: field(ListingField::FirstPrize),
            start_date,
            category_tags: listing.get(ListingField::Category).and_then(split_tags),
            source: listing.source.clone(),
            relevance_score: 0,
        })
    }

    fn normalize_tool(&self, listing: &ToolListing) -> Result<Opportunity> {
        let Some(obj) = listing.item.as_object() else {
            return Err(AiScoutError::validation(format!(
                "{}: tool item is not a JSON object",
                listing.source
            )));
        };

        let title = text_field(obj, &["title", "name"]).ok_or_else(|| {
            AiScoutError::validation(format!("{}: item has no title", listing.source))
        })?;

        let kind = text_field(obj, &["type"])
            .and_then(|t| t.parse::<OpportunityType>().ok())
            .or(listing.fallback_type)
            .or_else(|| listing.category.parse().ok())
            .ok_or_else(|| {
                AiScoutError::validation(format!(
                    "{}: '{title}' has no resolvable type",
                    listing.source
                ))
            })?;

        let detail = text_field(obj, &["link", "url"]).and_then(|raw| absolute_link(&raw));
        let official =
            text_field(obj, &["officialLink", "applyUrl"]).and_then(|raw| absolute_link(&raw));
        let link = official.clone().or_else(|| detail.clone()).ok_or_else(|| {
            AiScoutError::validation(format!("{}: '{title}' has no absolute link", listing.source))
        })?;
        let source_link = detail.unwrap_or_else(|| link.clone());

        let dates: DateRange = text_field(obj, &["date", "deadline", "endDate"])
            .map(|text| parse_date_range(&text, self.today))
            .unwrap_or_default();
        let start_date = text_field(obj, &["startDate"])
            .and_then(|text| parse_date(&text, self.today))
            .or(dates.start);

        let category_tags = match obj.get("tags").or_else(|| obj.get("categories")) {
            Some(Value::Array(values)) => {
                let tags: Vec<String> = values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                (!tags.is_empty()).then_some(tags)
            }
            Some(Value::String(s)) => split_tags(s),
            _ => None,
        };

        Ok(Opportunity {
            title,
            description: text_field(obj, &["description", "summary"]).unwrap_or_default(),
            kind,
            date: dates.end,
            company: text_field(obj, &["company", "organization"]),
            link,
            official_link: official,
            source_link,
            thumbnail: text_field(obj, &["thumbnail", "image", "imageUrl"])
                .and_then(|raw| absolute_link(&raw)),
            location: text_field(obj, &["location", "place"]),
            prize: text_field(obj, &["prize"]),
            salary: text_field(obj, &["salary"]),
            application_target: text_field(obj, &["applicationTarget"]),
            sponsor: text_field(obj, &["sponsor"]),
            total_prize: text_field(obj, &["totalPrize"]),
            first_prize: text_field(obj, &["firstPrize"]),
            start_date,
            category_tags,
            source: listing.source.clone(),
            relevance_score: 0,
        })
    }
}

/// First non-empty string or number under any of `keys`, whitespace-collapsed.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let text = match obj.get(*key)? {
            Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

/// Resolve a possibly relative link against `base`; http(s) results only.
fn resolve_link(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || raw.to_ascii_lowercase().starts_with("javascript:")
    {
        return None;
    }
    let url = base.join(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn absolute_link(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn split_tags(text: &str) -> Option<Vec<String>> {
    let tags: Vec<String> = text
        .split(TAG_SEPARATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!tags.is_empty()).then_some(tags)
}
