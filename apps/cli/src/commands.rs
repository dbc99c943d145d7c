//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use aiscout_core::{
    CrawlOrchestrator, CrawlPhase, CrawlProgress, CrawlRequest, DeduplicationGate,
};
use aiscout_mcp::{McpClient, McpSearchAdapter};
use aiscout_shared::{
    AppConfig, CrawlResult, OpportunityType, SourceStatus, init_config, load_config,
};
use aiscout_storage::Storage;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// aiscout: aggregate AI-related jobs, contests and events.
#[derive(Parser)]
#[command(
    name = "aiscout",
    version,
    about = "Crawl AI job, contest and event listings and queue them for review.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl sources and print (optionally ingest) the aggregate.
    Crawl {
        /// Restrict to one listing type: job, contest, or event.
        #[arg(short = 't', long = "type")]
        kind: Option<OpportunityType>,

        /// Search keyword; also queries the tool-call search service.
        #[arg(short, long)]
        keyword: Option<String>,

        /// Keep only AI-related items.
        #[arg(long)]
        ai_only: bool,

        /// Insert new items into the review queue.
        #[arg(long)]
        ingest: bool,

        /// Database path (defaults to ~/.aiscout/aiscout.db).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,

        /// Override the number of concurrent source fetches.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Number of items shown in the summary.
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// List configured sources.
    Sources,

    /// Tool-call search service operations.
    #[command(name = "mcp")]
    Mcp {
        #[command(subcommand)]
        action: McpAction,
    },

    /// List stored items awaiting review.
    Pending {
        /// Maximum rows to show.
        #[arg(long, default_value = "50")]
        limit: u32,

        /// Database path (defaults to ~/.aiscout/aiscout.db).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Tool-call service subcommands.
#[derive(Subcommand)]
pub(crate) enum McpAction {
    /// List advertised tools and check the configured tool map against them.
    Tools,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "aiscout=info",
        1 => "aiscout=debug",
        _ => "aiscout=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            kind,
            keyword,
            ai_only,
            ingest,
            db,
            json,
            concurrency,
            limit,
        } => {
            let request = CrawlRequest {
                kind,
                keyword,
                ai_only,
            };
            let options = CrawlOptions {
                ingest,
                db,
                json,
                concurrency,
                limit,
            };
            cmd_crawl(&request, &options).await
        }
        Command::Sources => cmd_sources().await,
        Command::Mcp { action } => match action {
            McpAction::Tools => cmd_mcp_tools().await,
        },
        Command::Pending { limit, db } => cmd_pending(limit, db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

struct CrawlOptions {
    ingest: bool,
    db: Option<PathBuf>,
    json: bool,
    concurrency: Option<u32>,
    limit: usize,
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_crawl(request: &CrawlRequest, options: &CrawlOptions) -> Result<()> {
    let mut config = load_config()?;
    if let Some(n) = options.concurrency {
        if n == 0 {
            return Err(eyre!("--concurrency must be at least 1"));
        }
        config.defaults.concurrency = n;
    }

    let orchestrator = CrawlOrchestrator::from_config(&config)?;
    info!(request = %request.label(), sources = orchestrator.sources().len(), "starting crawl");

    let progress = CliProgress::new(!options.json);
    let mut result = orchestrator.crawl(request, &progress).await;
    progress.finish();
    result.sort_by_relevance();

    let report = if options.ingest {
        let path = match &options.db {
            Some(p) => p.clone(),
            None => config.database_path()?,
        };
        let storage = Storage::open(&path).await?;
        let report = DeduplicationGate::new(&storage)
            .ingest_crawl(&request.label(), &result)
            .await?;
        Some((path, report))
    } else {
        None
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_crawl_summary(&result, options.limit);
    if let Some((path, report)) = report {
        println!(
            "  Ingested: {} new, {} duplicate(s) skipped -> {}",
            report.inserted,
            report.skipped,
            path.display()
        );
        println!();
    }
    Ok(())
}

fn print_crawl_summary(result: &CrawlResult, limit: usize) {
    println!();
    println!("  Sources:");
    for (source, status) in &result.per_source_status {
        println!("    {source:<28} {}", status_label(status));
    }
    println!();
    println!(
        "  Items: {} found, {} dropped, {} source(s) failed{}",
        result.items_found,
        result.items_dropped,
        result.failed_sources(),
        if result.success { "" } else { " (crawl defect, see logs)" }
    );
    println!();

    for opp in result.items.iter().take(limit) {
        let date = opp
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  [{:>2}] {:<7} {:<10} {}",
            opp.relevance_score,
            opp.kind.as_str(),
            date,
            opp.title
        );
        println!("       {}", opp.link);
    }
    if result.items.len() > limit {
        println!("  ... {} more", result.items.len() - limit);
    }
    println!();
}

fn status_label(status: &SourceStatus) -> String {
    match status {
        SourceStatus::Ok { items } => format!("ok ({items})"),
        SourceStatus::Failed { kind, reason } => format!("failed [{kind}] {reason}"),
    }
}

async fn cmd_sources() -> Result<()> {
    let config = load_config()?;
    let sources = config.effective_sources();
    if sources.is_empty() {
        println!("No sources configured.");
        return Ok(());
    }

    println!();
    for source in &sources {
        let state = if source.enabled { "" } else { " (disabled)" };
        println!(
            "  {:<14} {:<7} {:<4} {}{state}",
            source.name,
            source.item_type.as_str(),
            source.format.as_str(),
            source.url
        );
        if source.rules.len() > 1 {
            println!("  {:<14} {} fallback rule set(s)", "", source.rules.len() - 1);
        }
    }
    println!();
    Ok(())
}

async fn cmd_mcp_tools() -> Result<()> {
    let config = load_config()?;
    let client = McpClient::new(&config.mcp)?;
    let endpoint = client.endpoint().to_string();
    let adapter = McpSearchAdapter::new(client, config.mcp.tools.clone());

    let tools = adapter.client().list_tools().await?;
    println!();
    println!("  {} tool(s) at {endpoint}", tools.len());
    for tool in &tools {
        match &tool.description {
            Some(desc) => println!("    {:<24} {desc}", tool.name),
            None => println!("    {}", tool.name),
        }
    }

    let missing = adapter.missing_tools(&tools);
    println!();
    if missing.is_empty() {
        println!("  Tool map OK: every configured tool is advertised.");
    } else {
        println!("  Tool map references unadvertised tool(s): {}", missing.join(", "));
    }
    println!();
    Ok(())
}

async fn cmd_pending(limit: u32, db: Option<PathBuf>) -> Result<()> {
    let path = match db {
        Some(p) => p,
        None => load_config()?.database_path()?,
    };
    let storage = Storage::open_readonly(&path).await?;
    let rows = storage.list_pending(limit).await?;
    let total = storage.count_opportunities().await?;

    println!();
    if let Some(run) = storage.latest_crawl_run().await? {
        let state = match &run.finished_at {
            Some(_) => "finished",
            None => "unfinished",
        };
        println!("  Last crawl: {} at {} ({state})", run.kind, run.started_at);
        println!();
    }
    if rows.is_empty() {
        println!("  No items awaiting review ({total} stored).");
        println!();
        return Ok(());
    }
    for row in &rows {
        println!(
            "  {} {:<7} {:<10} {}",
            row.created_at.get(..10).unwrap_or(&row.created_at),
            row.kind,
            row.date.as_deref().unwrap_or("-"),
            row.title
        );
        println!("             {} ({})", row.link, row.source);
    }
    println!();
    println!("  {} pending shown, {total} stored", rows.len());
    println!();
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Spinner that follows the crawl phases and per-source completions.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new(visible: bool) -> Self {
        if !visible {
            return Self {
                spinner: ProgressBar::hidden(),
            };
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl CrawlProgress for CliProgress {
    fn phase(&self, phase: CrawlPhase) {
        if phase != CrawlPhase::Idle {
            self.spinner.set_message(phase.label().to_string());
        }
    }

    fn source_done(&self, source: &str, status: &SourceStatus, done: usize, total: usize) {
        self.spinner
            .set_message(format!("[{done}/{total}] {source}: {}", status_label(status)));
        if !status.is_ok() {
            self.spinner
                .println(format!("  ! {source}: {}", status_label(status)));
        }
    }
}
