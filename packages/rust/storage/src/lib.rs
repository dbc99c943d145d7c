//! Embedded libSQL storage for the opportunity moderation queue.
//!
//! The [`Storage`] struct wraps a local libSQL database holding ingested
//! opportunities (inserted unapproved and inactive) and a history of crawl
//! runs.
//!
//! **Access rules:**
//! - `aiscout crawl --ingest`: read-write via [`Storage::open`]
//! - Listing commands: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use aiscout_shared::{AiScoutError, Opportunity, Result};
use chrono::Utc;
use libsql::{Connection, Database, params};
use serde::Serialize;
use uuid::Uuid;

fn storage_err(e: libsql::Error) -> AiScoutError {
    AiScoutError::Storage(e.to_string())
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// A stored row as shown in the moderation queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredOpportunity {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: Option<String>,
    pub link: String,
    pub source_link: String,
    pub source: String,
    pub relevance_score: i64,
    pub approved: bool,
    pub active: bool,
    pub created_at: String,
}

/// One recorded crawl run. `finished_at` stays empty for a run that never
/// closed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRun {
    pub id: String,
    pub kind: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub stats_json: Option<String>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AiScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for reading only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AiScoutError::Storage(format!(
                "database not found: {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    AiScoutError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 before the first migration.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0,
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(AiScoutError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Opportunities
    // -----------------------------------------------------------------------

    /// Id of an existing row whose `link` equals `link` or whose `title`
    /// equals `title` exactly.
    pub async fn find_duplicate(&self, link: &str, title: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM opportunities WHERE link = ?1 OR title = ?2 LIMIT 1",
                params![link, title],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(row.get::<String>(0).map_err(storage_err)?)),
            None => Ok(None),
        }
    }

    /// Insert an opportunity as a pending (unapproved, inactive) row.
    /// Returns the generated id.
    pub async fn insert_pending_opportunity(&self, opp: &Opportunity) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let date = opp.date.map(|d| d.to_string());
        let start_date = opp.start_date.map(|d| d.to_string());
        let tags = match &opp.category_tags {
            Some(tags) => Some(
                serde_json::to_string(tags)
                    .map_err(|e| AiScoutError::Storage(format!("encode category tags: {e}")))?,
            ),
            None => None,
        };

        self.conn
            .execute(
                "INSERT INTO opportunities (
                    id, title, description, type, date, start_date, company, link,
                    official_link, source_link, thumbnail, location, prize, salary,
                    application_target, sponsor, total_prize, first_prize, category_tags,
                    source, relevance_score, approved, active, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                           ?15, ?16, ?17, ?18, ?19, ?20, ?21, 0, 0, ?22)",
                params![
                    id.as_str(),
                    opp.title.as_str(),
                    opp.description.as_str(),
                    opp.kind.as_str(),
                    date,
                    start_date,
                    opp.company.clone(),
                    opp.link.as_str(),
                    opp.official_link.clone(),
                    opp.source_link.as_str(),
                    opp.thumbnail.clone(),
                    opp.location.clone(),
                    opp.prize.clone(),
                    opp.salary.clone(),
                    opp.application_target.clone(),
                    opp.sponsor.clone(),
                    opp.total_prize.clone(),
                    opp.first_prize.clone(),
                    tags,
                    opp.source.as_str(),
                    i64::from(opp.relevance_score),
                    now.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Unapproved rows, newest first.
    pub async fn list_pending(&self, limit: u32) -> Result<Vec<StoredOpportunity>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, type, date, link, source_link, source, relevance_score,
                        approved, active, created_at
                 FROM opportunities
                 WHERE approved = 0
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?1",
                params![i64::from(limit)],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_stored(&row)?);
        }
        Ok(results)
    }

    /// Total number of stored opportunities.
    pub async fn count_opportunities(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM opportunities", params![])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => {
                let count = row.get::<i64>(0).map_err(storage_err)?;
                Ok(u64::try_from(count).unwrap_or(0))
            }
            None => Ok(0),
        }
    }

    // -----------------------------------------------------------------------
    // Crawl runs
    // -----------------------------------------------------------------------

    /// Record the start of a crawl run. Returns the generated run id.
    pub async fn insert_crawl_run(&self, kind: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO crawl_runs (id, kind, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), kind, now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark a crawl run finished with its summary stats.
    pub async fn finish_crawl_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE crawl_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(AiScoutError::Storage(format!("no crawl run with id {run_id}")));
        }
        Ok(())
    }

    /// Most recently started crawl run, if any.
    pub async fn latest_crawl_run(&self) -> Result<Option<CrawlRun>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, kind, started_at, finished_at, stats_json FROM crawl_runs
                 ORDER BY started_at DESC, id DESC LIMIT 1",
                params![],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Ok(Some(CrawlRun {
                id: row.get::<String>(0).map_err(storage_err)?,
                kind: row.get::<String>(1).map_err(storage_err)?,
                started_at: row.get::<String>(2).map_err(storage_err)?,
                finished_at: row.get::<String>(3).ok(),
                stats_json: row.get::<String>(4).ok(),
            })),
            None => Ok(None),
        }
    }
}

fn row_to_stored(row: &libsql::Row) -> Result<StoredOpportunity> {
    Ok(StoredOpportunity {
        id: row.get::<String>(0).map_err(storage_err)?,
        title: row.get::<String>(1).map_err(storage_err)?,
        kind: row.get::<String>(2).map_err(storage_err)?,
        date: row.get::<String>(3).ok(),
        link: row.get::<String>(4).map_err(storage_err)?,
        source_link: row.get::<String>(5).map_err(storage_err)?,
        source: row.get::<String>(6).map_err(storage_err)?,
        relevance_score: row.get::<i64>(7).map_err(storage_err)?,
        approved: row.get::<i64>(8).map_err(storage_err)? != 0,
        active: row.get::<i64>(9).map_err(storage_err)? != 0,
        created_at: row.get::<String>(10).map_err(storage_err)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiscout_shared::OpportunityType;
    use chrono::NaiveDate;

    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("aiscout_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn opportunity(title: &str, link: &str) -> Opportunity {
        Opportunity {
            title: title.into(),
            description: "생성형 AI 활용 영상".into(),
            kind: OpportunityType::Contest,
            date: NaiveDate::from_ymd_opt(2025, 3, 5),
            company: None,
            link: link.into(),
            official_link: None,
            source_link: link.into(),
            thumbnail: None,
            location: None,
            prize: Some("500만원".into()),
            salary: None,
            application_target: None,
            sponsor: Some("한국인공지능협회".into()),
            total_prize: None,
            first_prize: None,
            start_date: None,
            category_tags: Some(vec!["영상/UCC".into()]),
            source: "wevity".into(),
            relevance_score: 4,
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("aiscout_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 2);
    }

    #[tokio::test]
    async fn pending_insert_and_list() {
        let storage = test_storage().await;
        let id = storage
            .insert_pending_opportunity(&opportunity("AI 영상 공모전", "https://a.example/1"))
            .await
            .expect("insert");

        assert_eq!(storage.count_opportunities().await.unwrap(), 1);
        let pending = storage.list_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
        assert_eq!(pending[0].kind, "contest");
        assert_eq!(pending[0].date.as_deref(), Some("2025-03-05"));
        assert!(!pending[0].approved);
        assert!(!pending[0].active);
    }

    #[tokio::test]
    async fn duplicate_lookup_matches_link_or_title() {
        let storage = test_storage().await;
        let id = storage
            .insert_pending_opportunity(&opportunity("AI 영상 공모전", "https://a.example/1"))
            .await
            .unwrap();

        let by_link = storage
            .find_duplicate("https://a.example/1", "다른 제목")
            .await
            .unwrap();
        assert_eq!(by_link.as_deref(), Some(id.as_str()));

        let by_title = storage
            .find_duplicate("https://b.example/2", "AI 영상 공모전")
            .await
            .unwrap();
        assert_eq!(by_title.as_deref(), Some(id.as_str()));

        // Exact match only: a whitespace variant is not caught.
        let near = storage
            .find_duplicate("https://b.example/2", "AI  영상 공모전")
            .await
            .unwrap();
        assert!(near.is_none());
    }

    #[tokio::test]
    async fn crawl_run_lifecycle() {
        let storage = test_storage().await;
        assert!(storage.latest_crawl_run().await.unwrap().is_none());

        let run_id = storage.insert_crawl_run("all").await.expect("insert run");
        assert!(!run_id.is_empty());
        let open = storage.latest_crawl_run().await.unwrap().expect("run recorded");
        assert_eq!(open.id, run_id);
        assert!(open.finished_at.is_none());

        storage
            .finish_crawl_run(&run_id, r#"{"itemsFound": 3}"#)
            .await
            .expect("finish run");
        let closed = storage.latest_crawl_run().await.unwrap().expect("run recorded");
        assert!(closed.finished_at.is_some());
        assert_eq!(closed.stats_json.as_deref(), Some(r#"{"itemsFound": 3}"#));
        assert!(storage.finish_crawl_run("missing", "{}").await.is_err());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("aiscout_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.insert_crawl_run("all").await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.count_opportunities().await.unwrap(), 0);
        let result = ro
            .insert_pending_opportunity(&opportunity("x", "https://x.example"))
            .await;
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("aiscout_missing_{}.db", Uuid::now_v7()));
        assert!(Storage::open_readonly(&tmp).await.is_err());
    }
}
