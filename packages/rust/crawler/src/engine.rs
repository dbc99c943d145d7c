//! Descriptor-driven source adapter.
//!
//! One [`SourceAdapter`] serves every configured site: it fetches the
//! descriptor's URL with a browser-like client, applies the primary rule set,
//! walks the fallbacks when the primary matches nothing, and reports the
//! outcome as a [`SourceFetch`] instead of an error.

use std::time::{Duration, Instant};

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use tracing::{debug, info, instrument, warn};
use url::Url;

use aiscout_shared::{
    AiScoutError, CrawlConfig, RawListing, Result, ScrapedListing, SourceDescriptor,
    SourceStatus,
};

use crate::adapters::ParserRegistry;

/// Maximum number of redirects a listing page may take.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// SourceFetch
// ---------------------------------------------------------------------------

/// Outcome of fetching one source. Failures are carried in `status`.
#[derive(Debug, Clone)]
pub struct SourceFetch {
    /// Source name.
    pub source: String,
    /// Listings parsed from the response (empty on failure).
    pub listings: Vec<RawListing>,
    /// `Ok { items }` or the recorded failure.
    pub status: SourceStatus,
    /// Wall time spent on the source.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// SourceAdapter
// ---------------------------------------------------------------------------

/// Generic fetch-and-parse adapter parameterized by a [`SourceDescriptor`].
pub struct SourceAdapter {
    client: Client,
    default_timeout: Duration,
    parsers: ParserRegistry,
}

impl SourceAdapter {
    /// Create an adapter with the crawl's User-Agent and default timeout.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(config.source_timeout)
            .build()
            .map_err(|e| AiScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            default_timeout: config.source_timeout,
            parsers: ParserRegistry::new(),
        })
    }

    /// Effective timeout for a source.
    pub fn timeout_for(&self, descriptor: &SourceDescriptor) -> Duration {
        descriptor
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
    }

    /// Fetch and parse one source. Never fails: errors become a failed status.
    #[instrument(skip_all, fields(source = %descriptor.name))]
    pub async fn fetch(&self, descriptor: &SourceDescriptor, keyword: Option<&str>) -> SourceFetch {
        let start = Instant::now();
        let timeout = self.timeout_for(descriptor);

        let outcome = match tokio::time::timeout(timeout, self.try_fetch(descriptor, keyword)).await
        {
            Ok(result) => result,
            Err(_) => Err(AiScoutError::Network(format!(
                "timed out after {}s",
                timeout.as_secs_f64()
            ))),
        };

        let elapsed = start.elapsed();
        match outcome {
            Ok(listings) => {
                debug!(
                    items = listings.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "source fetched"
                );
                SourceFetch {
                    source: descriptor.name.clone(),
                    status: SourceStatus::Ok {
                        items: listings.len(),
                    },
                    listings,
                    elapsed,
                }
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms = elapsed.as_millis(), "source failed");
                SourceFetch {
                    source: descriptor.name.clone(),
                    listings: Vec::new(),
                    status: SourceStatus::failed(e.failure_kind(), e.to_string()),
                    elapsed,
                }
            }
        }
    }

    async fn try_fetch(
        &self,
        descriptor: &SourceDescriptor,
        keyword: Option<&str>,
    ) -> Result<Vec<RawListing>> {
        let request_url = descriptor.request_url(keyword);
        let page_url = Url::parse(&request_url)
            .map_err(|e| AiScoutError::config(format!("invalid source URL '{request_url}': {e}")))?;

        debug!(url = %page_url, "fetching listing page");

        let response = self
            .client
            .get(page_url.as_str())
            .send()
            .await
            .map_err(|e| AiScoutError::Network(format!("{page_url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AiScoutError::Network(format!("{page_url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AiScoutError::Network(format!("{page_url}: body read failed: {e}")))?;

        self.parse_body(descriptor, &body, &page_url)
    }

    /// Parse a fetched body with the descriptor's rule sets, primary first.
    ///
    /// Errors with [`AiScoutError::Parse`] when no rule set yields a listing.
    pub fn parse_body(
        &self,
        descriptor: &SourceDescriptor,
        body: &str,
        page_url: &Url,
    ) -> Result<Vec<RawListing>> {
        let parser = self.parsers.for_format(descriptor.format);
        let base_url = Url::parse(&descriptor.base_url).map_err(|e| {
            AiScoutError::config(format!("invalid base_url '{}': {e}", descriptor.base_url))
        })?;

        for (idx, rules) in descriptor.rules.iter().enumerate() {
            let extracted = parser.extract(body, rules)?;
            if extracted.is_empty() {
                debug!(rule_set = idx, parser = parser.name(), "rule set matched nothing");
                continue;
            }

            if idx > 0 {
                info!(
                    rule_set = idx,
                    items = extracted.len(),
                    "primary selectors stale, fallback rule set matched"
                );
            }

            return Ok(extracted
                .into_iter()
                .map(|fields| {
                    RawListing::Scraped(ScrapedListing {
                        source: descriptor.name.clone(),
                        item_type: descriptor.item_type,
                        base_url: base_url.clone(),
                        page_url: page_url.clone(),
                        fields,
                    })
                })
                .collect());
        }

        Err(AiScoutError::parse(format!(
            "no listings matched primary or {} fallback rule set(s)",
            descriptor.rules.len().saturating_sub(1)
        )))
    }
}
