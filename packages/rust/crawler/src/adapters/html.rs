//! CSS-selector listing parser for HTML pages.

use aiscout_shared::{AiScoutError, ExtractionRules, ListingField, Result, split_field_rule};
use scraper::{ElementRef, Html, Selector};

use super::{ExtractedFields, ListingParser, insert_field};

/// Extracts listings from HTML using the rule set's CSS selectors.
pub struct HtmlListParser;

impl ListingParser for HtmlListParser {
    fn extract(&self, body: &str, rules: &ExtractionRules) -> Result<Vec<ExtractedFields>> {
        let item_sel = compile(&rules.item)?;

        // Pre-compile field selectors; `None` addresses the item element itself.
        let mut field_rules = Vec::new();
        for (field, rule) in rules.fields.entries() {
            let (selector, attr) = split_field_rule(rule);
            let selector = if selector.is_empty() {
                None
            } else {
                Some(compile(selector)?)
            };
            field_rules.push((field, selector, attr));
        }

        let doc = Html::parse_document(body);
        let mut listings = Vec::new();

        for item in doc.select(&item_sel) {
            let mut fields = ExtractedFields::new();
            for (field, selector, attr) in &field_rules {
                let target = match selector {
                    Some(sel) => item.select(sel).next(),
                    None => Some(item),
                };
                if let Some(value) = target.and_then(|el| read_value(el, *attr)) {
                    insert_field(&mut fields, *field, &value);
                }
            }

            if fields.contains_key(&ListingField::Title) {
                listings.push(fields);
            }
        }

        Ok(listings)
    }

    fn name(&self) -> &str {
        "html"
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| AiScoutError::parse(format!("invalid selector '{selector}': {e:?}")))
}

/// Attribute value when `attr` is set, element text otherwise.
fn read_value(el: ElementRef<'_>, attr: Option<&str>) -> Option<String> {
    match attr {
        Some(name) => el.value().attr(name).map(str::to_string),
        None => Some(el.text().collect::<String>()),
    }
}
