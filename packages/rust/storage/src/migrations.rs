//! Schema migrations for the opportunity database.
//!
//! Applied in ascending order on [`Storage::open`](crate::Storage::open); each
//! script records its own version in `schema_migrations`.

pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: opportunities moderation queue",
            sql: r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- No UNIQUE constraint on link or title: duplicates are filtered by a
-- read-then-write check in the ingest gate.
CREATE TABLE IF NOT EXISTS opportunities (
    id                 TEXT PRIMARY KEY,
    title              TEXT NOT NULL,
    description        TEXT NOT NULL DEFAULT '',
    type               TEXT NOT NULL,
    date               TEXT,
    start_date         TEXT,
    company            TEXT,
    link               TEXT NOT NULL,
    official_link      TEXT,
    source_link        TEXT NOT NULL,
    thumbnail          TEXT,
    location           TEXT,
    prize              TEXT,
    salary             TEXT,
    application_target TEXT,
    sponsor            TEXT,
    total_prize        TEXT,
    first_prize        TEXT,
    category_tags      TEXT,
    source             TEXT NOT NULL,
    relevance_score    INTEGER NOT NULL DEFAULT 0,
    approved           INTEGER NOT NULL DEFAULT 0,
    active             INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_opportunities_link ON opportunities(link);
CREATE INDEX IF NOT EXISTS idx_opportunities_title ON opportunities(title);
CREATE INDEX IF NOT EXISTS idx_opportunities_approved ON opportunities(approved);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Crawl run history",
            sql: r#"
CREATE TABLE IF NOT EXISTS crawl_runs (
    id          TEXT PRIMARY KEY,
    kind        TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
