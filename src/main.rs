//! Focal-Crawl main entry point
//!
//! This is the command-line interface for the Focal-Crawl focused crawler.

use anyhow::Context;
use clap::Parser;
use focal_crawl::config::{load_config_with_hash, validate, Config, CrawlPolicy};
use focal_crawl::crawler::crawl;
use focal_crawl::output::{compute_statistics, load_latest_report, print_statistics, write_outputs};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Domains listed in the statistics printout
const TOP_DOMAINS: usize = 10;

/// Focal-Crawl: a novelty-driven focused web crawler
///
/// Focal-Crawl starts from the search results for a phrase and keeps
/// fetching the pages whose URL prefixes are least explored and most linked,
/// respecting robots.txt, until the target number of pages is reached.
#[derive(Parser, Debug)]
#[command(name = "focal-crawl")]
#[command(version)]
#[command(about = "A novelty-driven focused web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the last run stored in the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Override the seed search phrase
    #[arg(long)]
    phrase: Option<String>,

    /// Override the number of pages to crawl
    #[arg(long)]
    target: Option<usize>,

    /// Override the number of workers
    #[arg(long)]
    workers: Option<usize>,

    /// Override the frontier policy (prioritized, breadth-first)
    #[arg(long)]
    policy: Option<CrawlPolicy>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(phrase) = &self.phrase {
            config.seeds.phrase = phrase.clone();
        }
        if let Some(target) = self.target {
            config.crawler.target = target;
        }
        if let Some(workers) = self.workers {
            config.crawler.workers = workers;
        }
        if let Some(policy) = self.policy {
            config.crawler.policy = policy;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid command-line override")?;

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config, &config_hash, cli.quiet).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("focal_crawl=info,warn"),
            1 => EnvFilter::new("focal_crawl=debug,info"),
            2 => EnvFilter::new("focal_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn display_path(path: &Option<String>) -> &str {
    path.as_deref().unwrap_or("(disabled)")
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Focal-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Policy: {}", config.crawler.policy);
    println!("  Workers: {}", config.crawler.workers);
    println!("  Target pages: {}", config.crawler.target);
    match config.crawler.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unlimited"),
    }
    println!("  Pop timeout: {}ms", config.crawler.pop_timeout_ms);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout_secs);
    println!("  Robots timeout: {}s", config.crawler.robots_timeout_secs);
    if config.crawler.robots_cache_ttl_secs == 0 {
        println!("  Robots cache: off (checked for every page)");
    } else {
        println!("  Robots cache: {}s", config.crawler.robots_cache_ttl_secs);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSeeds:");
    println!("  Phrase: {}", config.seeds.phrase);
    println!("  Search results: {} from {}", config.seeds.count, config.seeds.search_url);
    println!("  Configured URLs ({}):", config.seeds.urls.len());
    for url in &config.seeds.urls {
        println!("    * {}", url);
    }

    println!("\nOutput:");
    println!("  CSV: {}", display_path(&config.output.csv_path));
    println!("  JSON: {}", display_path(&config.output.json_path));
    println!("  Database: {}", display_path(&config.output.database_path));
    println!("  Domains: {}", display_path(&config.output.domains_path));

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics for the last stored run
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = config
        .output
        .database_path
        .as_deref()
        .context("No database-path configured in [output]")?;

    println!("Database: {}\n", path);
    match load_latest_report(Path::new(path))? {
        Some((hash, entries)) => {
            println!("Config hash: {}\n", hash);
            print_statistics(&compute_statistics(&entries), TOP_DOMAINS);
        }
        None => println!("No crawl runs found in database"),
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling for '{}' with {} workers until {} pages",
        config.seeds.phrase,
        config.crawler.workers,
        config.crawler.target
    );

    let outcome = crawl(config).await.context("Crawl failed")?;
    if outcome.worker_restarts > 0 {
        tracing::warn!("{} workers were restarted after panics", outcome.worker_restarts);
    }
    tracing::info!(
        "Skipped {} pages denied by robots.txt; frontier trie holds {} nodes",
        outcome.robots_denied,
        outcome.frontier_nodes
    );

    write_outputs(&config.output, &outcome.entries, config_hash)
        .context("Failed to write crawl report")?;

    if !quiet {
        print_statistics(&compute_statistics(&outcome.entries), TOP_DOMAINS);
    }

    Ok(())
}
