//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use returnscope_core::pipeline::{ProgressReporter, RunConfig, RunResult};
use returnscope_core::{StopFlag, check_keys, refresh_cache};
use returnscope_crawler::{AuthHeaders, CrawlStore, CredentialProvider, StaticCredentials};
use returnscope_shared::{
    CrawlConfig, DateRange, EnrichConfig, EnrichmentResult, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ReturnScope — reconcile marketplace return keys against seller-center data.
#[derive(Parser)]
#[command(
    name = "returnscope",
    version,
    about = "Crawl seller-center returns, match return keys, and enrich matches with warehouse details.",
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
    /// Full pipeline: crawl, match the given keys, enrich every match.
    Run {
        /// File with one return key per line.
        keys_file: PathBuf,

        /// Crawl window: the last N days (ignored when --from/--to are set).
        #[arg(long, default_value = "30")]
        days: u32,

        /// Window start as epoch seconds (requires --to).
        #[arg(long, requires = "to")]
        from: Option<i64>,

        /// Window end as epoch seconds (requires --from).
        #[arg(long, requires = "from")]
        to: Option<i64>,

        /// Override the seller-center base URL from config.
        #[arg(long)]
        base_url: Option<String>,

        /// Override the enrichment concurrency bound.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Override the per-item enrichment timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Session cookie for the seller-center API.
        #[arg(long, env = "RETURNSCOPE_COOKIE", hide_env_values = true)]
        cookie: Option<String>,
    },

    /// Crawl the window and report what the index would contain.
    Crawl {
        /// Crawl window: the last N days (ignored when --from/--to are set).
        #[arg(long, default_value = "30")]
        days: u32,

        /// Window start as epoch seconds (requires --to).
        #[arg(long, requires = "to")]
        from: Option<i64>,

        /// Window end as epoch seconds (requires --from).
        #[arg(long, requires = "from")]
        to: Option<i64>,

        /// Override the seller-center base URL from config.
        #[arg(long)]
        base_url: Option<String>,

        /// Session cookie for the seller-center API.
        #[arg(long, env = "RETURNSCOPE_COOKIE", hide_env_values = true)]
        cookie: Option<String>,
    },

    /// Crawl and match without enriching (a dry run of `run`).
    Check {
        /// File with one return key per line.
        keys_file: PathBuf,

        /// Crawl window: the last N days.
        #[arg(long, default_value = "30")]
        days: u32,

        /// Override the seller-center base URL from config.
        #[arg(long)]
        base_url: Option<String>,

        /// Session cookie for the seller-center API.
        #[arg(long, env = "RETURNSCOPE_COOKIE", hide_env_values = true)]
        cookie: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file if none exists.
    Init,
    /// Print the effective configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "returnscope=info",
        1 => "returnscope=debug",
        _ => "returnscope=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            keys_file,
            days,
            from,
            to,
            base_url,
            concurrency,
            timeout,
            cookie,
        } => {
            cmd_run(
                &keys_file,
                days,
                from,
                to,
                base_url.as_deref(),
                concurrency,
                timeout,
                cookie.as_deref(),
            )
            .await
        }
        Command::Crawl {
            days,
            from,
            to,
            base_url,
            cookie,
        } => cmd_crawl(days, from, to, base_url.as_deref(), cookie.as_deref()).await,
        Command::Check {
            keys_file,
            days,
            base_url,
            cookie,
        } => cmd_check(&keys_file, days, base_url.as_deref(), cookie.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn resolve_range(days: u32, from: Option<i64>, to: Option<i64>) -> Result<DateRange> {
    match (from, to) {
        (Some(lower), Some(upper)) => Ok(DateRange::new(lower, upper)?),
        _ => Ok(DateRange::last_days(days)),
    }
}

fn credentials_from(cookie: Option<&str>) -> Result<Arc<dyn CredentialProvider>> {
    let cookie = cookie.ok_or_else(|| {
        eyre!("no credentials: pass --cookie or set the RETURNSCOPE_COOKIE environment variable")
    })?;
    Ok(Arc::new(StaticCredentials::new(AuthHeaders::from_cookie(
        cookie,
    ))))
}

fn read_keys_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| eyre!("cannot read keys file '{}': {e}", path.display()))
}

#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    keys_file: &Path,
    days: u32,
    from: Option<i64>,
    to: Option<i64>,
    base_url: Option<&str>,
    concurrency: Option<u32>,
    timeout: Option<u64>,
    cookie: Option<&str>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(url) = base_url {
        config.api.base_url = url.to_string();
    }
    if let Some(c) = concurrency {
        config.enrich.concurrency = c;
    }
    if let Some(t) = timeout {
        config.enrich.timeout_secs = t;
    }

    let run_config = RunConfig {
        range: resolve_range(days, from, to)?,
        crawl: CrawlConfig::from(&config),
        enrich: EnrichConfig::from(&config),
    };

    let keys_text = read_keys_file(keys_file)?;
    let provider = credentials_from(cookie)?;
    let store = CrawlStore::new();

    // Ctrl-C stops new dispatches; in-flight work drains.
    let stop = StopFlag::new();
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, finishing in-flight work");
                stop.trigger();
            }
        });
    }

    info!(
        keys_file = %keys_file.display(),
        lower = run_config.range.lower,
        upper = run_config.range.upper,
        "starting run"
    );

    let reporter = CliProgress::new();
    let result = returnscope_core::run(
        &run_config,
        &keys_text,
        provider,
        &store,
        &reporter,
        &stop,
    )
    .await?;

    print_run_summary(&result);
    Ok(())
}

async fn cmd_crawl(
    days: u32,
    from: Option<i64>,
    to: Option<i64>,
    base_url: Option<&str>,
    cookie: Option<&str>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(url) = base_url {
        config.api.base_url = url.to_string();
    }

    let range = resolve_range(days, from, to)?;
    let provider = credentials_from(cookie)?;
    let store = CrawlStore::new();

    let reporter = CliProgress::new();
    let summary = refresh_cache(&range, &CrawlConfig::from(&config), provider, &store, &reporter)
        .await?;
    reporter.clear();

    println!();
    println!("  Crawl complete.");
    println!("  Records: {}", summary.record_count);
    println!("  Keys:    {}", summary.key_count);
    if let Some(at) = summary.last_updated {
        println!("  Updated: {}", at.to_rfc3339());
    }
    println!();

    Ok(())
}

async fn cmd_check(
    keys_file: &Path,
    days: u32,
    base_url: Option<&str>,
    cookie: Option<&str>,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(url) = base_url {
        config.api.base_url = url.to_string();
    }

    let keys_text = read_keys_file(keys_file)?;
    let provider = credentials_from(cookie)?;
    let store = CrawlStore::new();

    let reporter = CliProgress::new();
    refresh_cache(
        &DateRange::last_days(days),
        &CrawlConfig::from(&config),
        provider,
        &store,
        &reporter,
    )
    .await?;
    let (dropped, outcome) = check_keys(&store, &keys_text).await?;
    reporter.clear();

    println!();
    println!(
        "  Matched {} of {} keys ({:.1}%).",
        outcome.matched.len(),
        outcome.matched.len() + outcome.unmatched.len(),
        outcome.match_rate_percent
    );
    if dropped > 0 {
        println!("  Dropped {dropped} malformed key line(s).");
    }
    for key in &outcome.unmatched {
        println!("  unmatched: {key}");
    }
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config file: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| eyre!("cannot render configuration: {e}"))?;
    print!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary printing
// ---------------------------------------------------------------------------

fn print_run_summary(result: &RunResult) {
    println!();
    println!("  Run {} complete in {:.1}s", result.run_id, result.elapsed.as_secs_f64());
    println!(
        "  Crawled: {} records ({} distinct keys)",
        result.crawled.record_count, result.crawled.key_count
    );
    println!(
        "  Keys:    {} valid, {} dropped",
        result.keys_total, result.keys_dropped
    );
    println!(
        "  Matched: {} of {} ({:.1}%)",
        result.outcome.matched.len(),
        result.keys_total,
        result.outcome.match_rate_percent
    );
    println!(
        "  Enriched: {} of {} succeeded",
        result.enriched_ok,
        result.enrichments.len()
    );
    println!();

    let mut rows: Vec<&EnrichmentResult> = result.enrichments.iter().collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    for row in rows {
        let status = if row.success { "ok" } else { "failed" };
        println!("  {:<20} {:<12} {:<8} {}", row.key, row.id, row.warehouse, status);
    }
    if !result.enrichments.is_empty() {
        println!();
    }

    for key in &result.outcome.unmatched {
        println!("  unmatched: {key}");
    }
    if !result.outcome.unmatched.is_empty() {
        println!();
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_fetched(&self, page: u32, raw_count: usize) {
        self.spinner
            .set_message(format!("Crawling page {page} ({raw_count} records)"));
    }

    fn item_done(&self, total: usize, completed: usize, result: &EnrichmentResult) {
        self.spinner
            .set_message(format!("Enriching [{completed}/{total}] {}", result.key));
    }

    fn done(&self, _result: &RunResult) {
        self.spinner.finish_and_clear();
    }
}
