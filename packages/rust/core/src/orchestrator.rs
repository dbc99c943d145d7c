//! Crawl orchestration: concurrent fan-out over sources, then aggregation.
//!
//! One call walks `Idle → Dispatching → Collecting → Aggregated`; nothing is
//! kept between calls. Source outages are recorded per source and never
//! abort the run.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use aiscout_crawler::SourceAdapter;
use aiscout_mcp::{McpClient, McpSearchAdapter};
use aiscout_shared::{
    AppConfig, CrawlConfig, CrawlResult, FailureKind, OpportunityType,
    RawListing, Result, SourceDescriptor, SourceStatus,
};

use crate::normalize::NormalizationEngine;
use crate::relevance::RelevanceScorer;

/// Lifecycle of a single crawl call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Dispatching,
    Collecting,
    Aggregated,
}

impl CrawlPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Dispatching => "dispatching sources",
            Self::Collecting => "collecting results",
            Self::Aggregated => "aggregated",
        }
    }
}

/// Progress callback for reporting crawl status.
pub trait CrawlProgress: Send + Sync {
    /// Called on every phase transition.
    fn phase(&self, phase: CrawlPhase);
    /// Called as each source's outcome is collected.
    fn source_done(&self, source: &str, status: &SourceStatus, done: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl CrawlProgress for SilentProgress {
    fn phase(&self, _phase: CrawlPhase) {}
    fn source_done(&self, _source: &str, _status: &SourceStatus, _done: usize, _total: usize) {}
}

/// What one crawl call should cover.
#[derive(Debug, Clone, Default)]
pub struct CrawlRequest {
    /// Only dispatch sources producing this type.
    pub kind: Option<OpportunityType>,
    /// Search term. Together with `kind` it also enables the tool-call
    /// search, whose items take `kind` when they carry no type of their own.
    pub keyword: Option<String>,
    /// Keep only items with a non-zero relevance score.
    pub ai_only: bool,
}

impl CrawlRequest {
    fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Short label for logs and run history.
    pub fn label(&self) -> String {
        let mut label = match self.kind {
            Some(kind) => kind.as_str().to_string(),
            None => "all".to_string(),
        };
        if self.ai_only {
            label.push_str("+ai");
        }
        if let Some(keyword) = self.keyword() {
            label.push_str(&format!(" '{keyword}'"));
        }
        label
    }
}

/// One source's collected outcome.
struct SourceOutcome {
    source: String,
    listings: Vec<RawListing>,
    status: SourceStatus,
}

impl SourceOutcome {
    fn failed(source: String, kind: FailureKind, reason: impl Into<String>) -> Self {
        Self {
            source,
            listings: Vec::new(),
            status: SourceStatus::failed(kind, reason),
        }
    }
}

/// Wait for a fetch slot, then run `work`. The wait and the work share one
/// deadline fixed at dispatch, so queued sources cannot stack their limits.
async fn run_bounded<F>(
    sem: Arc<Semaphore>,
    source: String,
    limit: Duration,
    deadline: Instant,
    work: F,
) -> SourceOutcome
where
    F: Future<Output = SourceOutcome>,
{
    let bounded = async {
        let Ok(_permit) = sem.acquire_owned().await else {
            return SourceOutcome::failed(source.clone(), FailureKind::Internal, "semaphore closed");
        };
        work.await
    };
    let result = tokio::time::timeout_at(deadline, bounded).await;
    match result {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(source = %source, limit_secs = limit.as_secs_f64(), "source timed out");
            SourceOutcome::failed(
                source,
                FailureKind::Network,
                format!("timed out after {}s", limit.as_secs_f64()),
            )
        }
    }
}

/// Join one source task under the crawl ceiling. The flag is false only when
/// the task itself died.
async fn join_outcome(
    source: String,
    mut handle: JoinHandle<SourceOutcome>,
    deadline: Instant,
) -> (SourceOutcome, bool) {
    match tokio::time::timeout_at(deadline, &mut handle).await {
        Ok(Ok(outcome)) => (outcome, true),
        Ok(Err(e)) => {
            error!(source = %source, error = %e, "source task failed");
            let outcome = SourceOutcome::failed(
                source,
                FailureKind::Internal,
                format!("adapter task failed: {e}"),
            );
            (outcome, false)
        }
        Err(_) => {
            handle.abort();
            warn!(source = %source, "crawl deadline exceeded, source abandoned");
            let outcome =
                SourceOutcome::failed(source, FailureKind::Network, "crawl deadline exceeded");
            (outcome, true)
        }
    }
}

/// Dispatches source adapters and aggregates their output into a [`CrawlResult`].
pub struct CrawlOrchestrator {
    sources: Vec<SourceDescriptor>,
    adapter: Arc<SourceAdapter>,
    mcp: Option<Arc<McpSearchAdapter>>,
    scorer: RelevanceScorer,
    config: CrawlConfig,
    crawl_date: Option<NaiveDate>,
}

impl CrawlOrchestrator {
    pub fn new(
        sources: Vec<SourceDescriptor>,
        config: CrawlConfig,
        mcp: Option<McpSearchAdapter>,
        scorer: RelevanceScorer,
    ) -> Result<Self> {
        let adapter = SourceAdapter::new(&config)?;
        Ok(Self {
            sources,
            adapter: Arc::new(adapter),
            mcp: mcp.map(Arc::new),
            scorer,
            config,
            crawl_date: None,
        })
    }

    /// Build from loaded configuration. The tool-call search is wired in
    /// only when `[mcp] enabled` is set.
    pub fn from_config(app: &AppConfig) -> Result<Self> {
        let mcp = if app.mcp.enabled {
            let client = McpClient::new(&app.mcp)?;
            Some(McpSearchAdapter::new(client, app.mcp.tools.clone()))
        } else {
            None
        };
        Self::new(
            app.effective_sources(),
            CrawlConfig::from(app),
            mcp,
            RelevanceScorer::from_config(&app.relevance),
        )
    }

    /// Pin the date relative deadlines resolve against (defaults to today).
    pub fn with_crawl_date(mut self, date: NaiveDate) -> Self {
        self.crawl_date = Some(date);
        self
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// Crawl every enabled source.
    pub async fn crawl_all(&self) -> CrawlResult {
        self.crawl(&CrawlRequest::default(), &SilentProgress).await
    }

    /// Crawl sources of one type; with a keyword, also query the tool service.
    pub async fn crawl_by_type(&self, kind: OpportunityType, keyword: Option<&str>) -> CrawlResult {
        let request = CrawlRequest {
            kind: Some(kind),
            keyword: keyword.map(str::to_string),
            ai_only: false,
        };
        self.crawl(&request, &SilentProgress).await
    }

    /// [`crawl_all`](Self::crawl_all) filtered to related items.
    pub async fn crawl_ai_only(&self) -> CrawlResult {
        let request = CrawlRequest {
            ai_only: true,
            ..CrawlRequest::default()
        };
        self.crawl(&request, &SilentProgress).await
    }

    /// Run one crawl. Never fails; outages land in `per_source_status`.
    #[instrument(skip_all, fields(request = %request.label()))]
    pub async fn crawl(&self, request: &CrawlRequest, progress: &dyn CrawlProgress) -> CrawlResult {
        let started = Instant::now();
        let deadline = started + self.config.crawl_timeout;
        let keyword = request.keyword();

        progress.phase(CrawlPhase::Idle);

        // --- Dispatching ---
        progress.phase(CrawlPhase::Dispatching);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1) as usize));
        let dispatched = Instant::now();
        let mut tasks: Vec<(String, JoinHandle<SourceOutcome>)> = Vec::new();

        for descriptor in self.sources_for(request.kind) {
            let sem = semaphore.clone();
            let adapter = self.adapter.clone();
            let descriptor = descriptor.clone();
            let keyword = keyword.map(str::to_string);
            let name = descriptor.name.clone();
            let limit = adapter.timeout_for(&descriptor);

            tasks.push((
                name.clone(),
                tokio::spawn(run_bounded(sem, name, limit, dispatched + limit, async move {
                    let fetch = adapter.fetch(&descriptor, keyword.as_deref()).await;
                    SourceOutcome {
                        source: fetch.source,
                        listings: fetch.listings,
                        status: fetch.status,
                    }
                })),
            ));
        }

        match (&self.mcp, keyword, request.kind) {
            (Some(mcp), Some(keyword), Some(kind)) => {
                let category = kind.as_str().to_string();
                let name = mcp.source_name_for(&category);
                let sem = semaphore.clone();
                let mcp = mcp.clone();
                let keyword = keyword.to_string();
                let limit = mcp.client().timeout();

                tasks.push((
                    name.clone(),
                    tokio::spawn(run_bounded(sem, name, limit, dispatched + limit, async move {
                        let search = mcp.search(&category, &keyword, Some(kind)).await;
                        SourceOutcome {
                            source: search.source,
                            listings: search.listings,
                            status: search.status,
                        }
                    })),
                ));
            }
            (Some(_), Some(_), None) => {
                info!("tool search needs a listing type, skipped for untyped crawl");
            }
            _ => {}
        }

        info!(sources = tasks.len(), "crawl dispatched");

        // --- Collecting ---
        progress.phase(CrawlPhase::Collecting);
        let total = tasks.len();
        let mut success = true;
        let mut outcomes = Vec::with_capacity(total);

        for (done, (source, handle)) in tasks.into_iter().enumerate() {
            let (outcome, task_ok) = join_outcome(source, handle, deadline).await;
            success &= task_ok;
            progress.source_done(&outcome.source, &outcome.status, done + 1, total);
            outcomes.push(outcome);
        }

        // --- Aggregated ---
        let today = self
            .crawl_date
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let mut result = aggregate(outcomes, &NormalizationEngine::new(today, &self.scorer));
        result.success = success;

        if request.ai_only {
            result.items.retain(|opp| opp.relevance_score > 0);
            result.items_found = result.items.len();
        }

        progress.phase(CrawlPhase::Aggregated);
        info!(
            items = result.items_found,
            dropped = result.items_dropped,
            failed_sources = result.failed_sources(),
            success = result.success,
            elapsed_ms = started.elapsed().as_millis(),
            "crawl complete"
        );

        result
    }

    /// Enabled sources, optionally restricted to one type, in registration order.
    fn sources_for(&self, kind: Option<OpportunityType>) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources
            .iter()
            .filter(|s| s.enabled)
            .filter(move |s| kind.is_none_or(|k| s.item_type == k))
    }
}

/// Normalize and merge outcomes in order. The first item seen for a link wins.
fn aggregate(outcomes: Vec<SourceOutcome>, engine: &NormalizationEngine<'_>) -> CrawlResult {
    let mut items = Vec::new();
    let mut seen_links = HashSet::new();
    let mut per_source_status = BTreeMap::new();
    let mut items_dropped = 0;

    for outcome in outcomes {
        for raw in &outcome.listings {
            match engine.normalize(raw) {
                Ok(opp) => {
                    if seen_links.insert(opp.link.clone()) {
                        items.push(opp);
                    } else {
                        debug!(source = %outcome.source, link = %opp.link, "duplicate link collapsed");
                    }
                }
                Err(e) => {
                    items_dropped += 1;
                    warn!(source = %outcome.source, error = %e, "listing dropped");
                }
            }
        }
        per_source_status.insert(outcome.source, outcome.status);
    }

    CrawlResult {
        items_found: items.len(),
        items,
        success: true,
        per_source_status,
        items_dropped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant as StdInstant};

    use aiscout_shared::{McpConfig, default_tool_map, parse_sources};
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn source_toml(name: &str, kind: &str, base: &str, page: &str, timeout: Option<u64>) -> String {
        let timeout = timeout
            .map(|t| format!("timeout_secs = {t}\n"))
            .unwrap_or_default();
        format!(
            r#"
[[sources]]
name = "{name}"
item_type = "{kind}"
format = "html"
base_url = "{base}/"
url = "{base}/{page}"
search_url = "{base}/{page}?q={{keyword}}"
{timeout}
[[sources.rules]]
item = "li.item"
[sources.rules.fields]
title = "a"
link = "a@href"
date = ".date"
"#
        )
    }

    fn listing_page(entries: &[(&str, &str)]) -> String {
        let items: String = entries
            .iter()
            .map(|(title, href)| {
                format!(r#"<li class="item"><a href="{href}">{title}</a><span class="date">2025.3.5</span></li>"#)
            })
            .collect();
        format!("<html><body><ul>{items}</ul></body></html>")
    }

    fn crawl_config(source_timeout: u64, crawl_timeout: u64) -> CrawlConfig {
        CrawlConfig {
            concurrency: 8,
            source_timeout: Duration::from_secs(source_timeout),
            crawl_timeout: Duration::from_secs(crawl_timeout),
            ..CrawlConfig::default()
        }
    }

    fn orchestrator(
        sources_toml: &str,
        config: CrawlConfig,
        mcp: Option<McpSearchAdapter>,
    ) -> CrawlOrchestrator {
        let sources = parse_sources(sources_toml).unwrap();
        CrawlOrchestrator::new(sources, config, mcp, RelevanceScorer::new(["AI", "해커톤"]))
            .unwrap()
            .with_crawl_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    fn mcp_for(server: &MockServer) -> McpSearchAdapter {
        let config = McpConfig {
            endpoint: format!("{}/messages", server.uri()),
            timeout_secs: 2,
            ..McpConfig::default()
        };
        McpSearchAdapter::new(McpClient::new(&config).unwrap(), default_tool_map())
    }

    #[tokio::test]
    async fn all_sources_failing_is_still_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let base = server.uri();
        let toml = [
            source_toml("a", "contest", &base, "a", None),
            source_toml("b", "job", &base, "b", None),
        ]
        .concat();
        let result = orchestrator(&toml, crawl_config(2, 10), None).crawl_all().await;

        assert!(result.success);
        assert_eq!(result.items_found, 0);
        assert!(result.items.is_empty());
        assert_eq!(result.per_source_status.len(), 2);
        assert_eq!(result.failed_sources(), 2);
    }

    #[tokio::test]
    async fn slow_source_does_not_delay_past_its_timeout() {
        let server = MockServer::start().await;
        Mock::given(path("/fast"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(listing_page(&[("AI 공모전", "/c/1")])),
            )
            .mount(&server)
            .await;
        Mock::given(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_page(&[("느린 공모전", "/c/2")]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let base = server.uri();
        let toml = [
            source_toml("slow", "contest", &base, "slow", Some(1)),
            source_toml("fast", "contest", &base, "fast", None),
        ]
        .concat();

        let start = StdInstant::now();
        let result = orchestrator(&toml, crawl_config(2, 10), None).crawl_all().await;

        assert!(start.elapsed() < Duration::from_millis(2500));
        assert!(result.success);
        assert_eq!(result.items_found, 1);
        assert_eq!(result.items[0].link, format!("{base}/c/1"));
        assert!(!result.per_source_status["slow"].is_ok());
    }

    #[tokio::test]
    async fn queued_sources_share_the_dispatch_time_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_page(&[("AI 공모전", "/c/1")]))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let base = server.uri();
        let toml = [
            source_toml("hung-a", "contest", &base, "a", Some(1)),
            source_toml("hung-b", "contest", &base, "b", Some(1)),
            source_toml("hung-c", "contest", &base, "c", Some(1)),
        ]
        .concat();
        let config = CrawlConfig {
            concurrency: 1,
            ..crawl_config(1, 30)
        };

        let start = StdInstant::now();
        let result = orchestrator(&toml, config, None).crawl_all().await;

        assert!(start.elapsed() < Duration::from_millis(2000));
        assert!(result.success);
        assert_eq!(result.failed_sources(), 3);
        for status in result.per_source_status.values() {
            assert!(matches!(
                status,
                SourceStatus::Failed { kind: FailureKind::Network, .. }
            ));
        }
    }

    #[tokio::test]
    async fn invalid_listing_is_dropped_alone() {
        let server = MockServer::start().await;
        Mock::given(path("/board"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
                ("AI 공모전", "/c/1"),
                ("링크 없는 공모전", "javascript:void(0)"),
                ("AI 해커톤", "/c/3"),
            ])))
            .mount(&server)
            .await;

        let toml = source_toml("board", "contest", &server.uri(), "board", None);
        let result = orchestrator(&toml, crawl_config(2, 10), None).crawl_all().await;

        assert!(result.success);
        assert_eq!(result.items_found, 2);
        assert_eq!(result.items_dropped, 1);
        assert_eq!(result.per_source_status["board"], SourceStatus::Ok { items: 3 });
        let titles: Vec<&str> = result.items.iter().map(|o| o.title.as_str()).collect();
        assert_eq!(titles, ["AI 공모전", "AI 해커톤"]);
    }

    #[tokio::test]
    async fn panicked_task_is_recorded_and_flagged() {
        let handle: JoinHandle<SourceOutcome> = tokio::spawn(async { panic!("adapter bug") });
        let deadline = Instant::now() + Duration::from_secs(5);

        let (outcome, task_ok) = join_outcome("broken".into(), handle, deadline).await;

        assert!(!task_ok);
        assert_eq!(outcome.source, "broken");
        assert!(matches!(
            outcome.status,
            SourceStatus::Failed { kind: FailureKind::Internal, .. }
        ));
    }

    #[tokio::test]
    async fn untyped_keyword_crawl_skips_tool_search() {
        let server = MockServer::start().await;
        Mock::given(path("/ev"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(listing_page(&[("AI 밋업", "/e/1")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let toml = source_toml("ev", "event", &server.uri(), "ev", None);
        let request = CrawlRequest {
            keyword: Some("AI".into()),
            ..CrawlRequest::default()
        };
        let result = orchestrator(&toml, crawl_config(2, 10), Some(mcp_for(&server)))
            .crawl(&request, &SilentProgress)
            .await;

        assert_eq!(result.per_source_status.len(), 1);
        assert_eq!(result.items_found, 1);
        assert_eq!(result.items_dropped, 0);
    }

    #[tokio::test]
    async fn crawl_ceiling_abandons_stragglers() {
        let server = MockServer::start().await;
        Mock::given(path("/stuck"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(listing_page(&[("멈춘 공모전", "/c/3")]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let toml = source_toml("stuck", "contest", &server.uri(), "stuck", Some(30));
        let start = StdInstant::now();
        let result = orchestrator(&toml, crawl_config(30, 1), None).crawl_all().await;

        assert!(start.elapsed() < Duration::from_millis(2500));
        assert!(result.success);
        assert_eq!(
            result.per_source_status["stuck"],
            SourceStatus::failed(FailureKind::Network, "crawl deadline exceeded")
        );
    }

    #[tokio::test]
    async fn contest_keyword_crawl_merges_sources_and_tool_search() {
        let server = MockServer::start().await;
        let shared_link = "https://hack.example.com/final";

        Mock::given(method("GET"))
            .and(path("/contests-a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
                ("AI 해커톤 본선", shared_link),
                ("AI 해커톤 예선", "/a/2"),
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contests-b"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
                ("AI 해커톤 본선 (재공지)", shared_link),
                ("대학생 AI 해커톤", "/b/7"),
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jobs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({
                "method": "tools/call",
                "params": { "arguments": { "keyword": "AI 해커톤" } }
            })))
            .respond_with(|req: &Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                let items = json!([
                    { "title": "AI 해커톤 본선", "link": "https://hack.example.com/final" },
                    { "title": "AI 해커톤 서울", "link": "https://seoul.example.com/hack" }
                ]);
                ResponseTemplate::new(200).set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": body["id"],
                    "result": { "content": [{ "type": "text", "text": items.to_string() }] }
                }))
            })
            .expect(1)
            .mount(&server)
            .await;

        let base = server.uri();
        let toml = [
            source_toml("contest-a", "contest", &base, "contests-a", None),
            source_toml("jobs", "job", &base, "jobs", None),
            source_toml("contest-b", "contest", &base, "contests-b", None),
        ]
        .concat();
        let orch = orchestrator(&toml, crawl_config(2, 10), Some(mcp_for(&server)));
        let result = orch
            .crawl_by_type(OpportunityType::Contest, Some("AI 해커톤"))
            .await;

        assert!(result.success);
        assert!(result.per_source_status.contains_key("contest-a"));
        assert!(result.per_source_status.contains_key("contest-b"));
        assert!(result.per_source_status.contains_key("mcp:search_activities"));
        assert!(!result.per_source_status.contains_key("jobs"));

        let mut links: Vec<&str> = result.items.iter().map(|o| o.link.as_str()).collect();
        let total = links.len();
        links.sort_unstable();
        links.dedup();
        assert_eq!(links.len(), total, "no two items share a link");
        assert_eq!(total, 4);

        // Registration order: first source's item holds the shared link.
        assert_eq!(result.items[0].title, "AI 해커톤 본선");
        assert_eq!(result.items[0].source, "contest-a");
        assert_eq!(result.items.last().map(|o| o.source.as_str()), Some("mcp:search_activities"));
        assert!(result.items.iter().all(|o| o.kind == OpportunityType::Contest));
    }

    #[tokio::test]
    async fn ai_only_keeps_related_items() {
        let server = MockServer::start().await;
        Mock::given(path("/mixed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
                ("AI 영상 콘테스트", "/m/1"),
                ("디자이너 채용", "/m/2"),
            ])))
            .mount(&server)
            .await;

        let toml = source_toml("mixed", "contest", &server.uri(), "mixed", None);
        let orch = orchestrator(&toml, crawl_config(2, 10), None);

        let all = orch.crawl_all().await;
        assert_eq!(all.items_found, 2);

        let related = orch.crawl_ai_only().await;
        assert_eq!(related.items_found, 1);
        assert_eq!(related.items[0].title, "AI 영상 콘테스트");
    }

    #[tokio::test]
    async fn disabled_sources_are_not_dispatched() {
        let server = MockServer::start().await;
        Mock::given(path("/off"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
            .expect(0)
            .mount(&server)
            .await;

        let toml = source_toml("off", "event", &server.uri(), "off", None)
            .replace("[[sources.rules]]", "enabled = false\n\n[[sources.rules]]");
        let result = orchestrator(&toml, crawl_config(2, 10), None).crawl_all().await;
        assert!(result.per_source_status.is_empty());
        assert!(result.success);
    }

    #[tokio::test]
    async fn keyword_without_tool_service_crawls_sources_only() {
        let server = MockServer::start().await;
        Mock::given(path("/ev"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(listing_page(&[("AI 밋업", "/e/1")])),
            )
            .mount(&server)
            .await;

        let toml = source_toml("ev", "event", &server.uri(), "ev", None);
        let result = orchestrator(&toml, crawl_config(2, 10), None)
            .crawl_by_type(OpportunityType::Event, Some("AI"))
            .await;
        assert_eq!(result.per_source_status.len(), 1);
        assert_eq!(result.items_found, 1);
    }

    #[test]
    fn request_labels() {
        let req = CrawlRequest {
            kind: Some(OpportunityType::Contest),
            keyword: Some(" AI 해커톤 ".into()),
            ai_only: true,
        };
        assert_eq!(req.label(), "contest+ai 'AI 해커톤'");
        assert_eq!(CrawlRequest::default().label(), "all");
    }
}
