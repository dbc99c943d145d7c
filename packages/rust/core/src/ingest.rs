//! Read-check-write ingestion of crawl output into the moderation queue.
//!
//! Each candidate is looked up by link or exact title before insertion. The
//! check and the insert are separate statements, so two concurrent ingests of
//! the same batch can both insert.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use aiscout_shared::{AiScoutError, CrawlResult, Opportunity, Result};
use aiscout_storage::Storage;

/// Outcome of one ingest pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped: usize,
    pub inserted_ids: Vec<String>,
}

/// Inserts candidates that have no stored duplicate, as pending rows.
pub struct DeduplicationGate<'a> {
    storage: &'a Storage,
}

impl<'a> DeduplicationGate<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    #[instrument(skip_all, fields(candidates = items.len()))]
    pub async fn ingest(&self, items: &[Opportunity]) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for opp in items {
            match self.storage.find_duplicate(&opp.link, &opp.title).await? {
                Some(existing) => {
                    debug!(link = %opp.link, existing = %existing, "duplicate skipped");
                    report.skipped += 1;
                }
                None => {
                    let id = self.storage.insert_pending_opportunity(opp).await?;
                    report.inserted += 1;
                    report.inserted_ids.push(id);
                }
            }
        }

        info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "ingest complete"
        );
        Ok(report)
    }

    /// Ingest a crawl's items and record the run with its summary.
    ///
    /// The run is closed even when ingestion fails partway; its stats then
    /// carry the error instead of an ingest report.
    pub async fn ingest_crawl(&self, label: &str, result: &CrawlResult) -> Result<IngestReport> {
        let run_id = self.storage.insert_crawl_run(label).await?;

        let ingested = self.ingest(&result.items).await;
        let ingest_stats = match &ingested {
            Ok(report) => serde_json::json!(report),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        let stats = serde_json::json!({
            "itemsFound": result.items_found,
            "itemsDropped": result.items_dropped,
            "success": result.success,
            "failedSources": result.failed_sources(),
            "perSourceStatus": result.per_source_status,
            "ingest": ingest_stats,
        });

        let finished = match serde_json::to_string(&stats) {
            Ok(stats_json) => self.storage.finish_crawl_run(&run_id, &stats_json).await,
            Err(e) => Err(AiScoutError::Storage(format!("encode run stats: {e}"))),
        };

        match (ingested, finished) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), finished) => {
                if let Err(close) = finished {
                    warn!(run = %run_id, error = %close, "could not close crawl run");
                }
                Err(e)
            }
        }
    }
}
