//! Crawl-and-aggregate pipeline for AI opportunity listings.
//!
//! Ties the source adapters and the tool-call search together: concurrent
//! dispatch, normalization into [`Opportunity`](aiscout_shared::Opportunity),
//! relevance scoring, and deduplicated ingestion into storage.

pub mod dates;
pub mod ingest;
pub mod normalize;
pub mod orchestrator;
pub mod relevance;

pub use ingest::{DeduplicationGate, IngestReport};
pub use normalize::NormalizationEngine;
pub use orchestrator::{CrawlOrchestrator, CrawlPhase, CrawlProgress, CrawlRequest, SilentProgress};
pub use relevance::RelevanceScorer;
