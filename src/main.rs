//! spa-crawler main entry point
//!
//! This is the command-line interface for crawling JavaScript-rendered sites.

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use spa_crawler::config::{load_config_with_hash, load_url_list, validate};
use spa_crawler::output::{summary_line, write_json, write_markdown};
use spa_crawler::{crawl, CrawlConfig, WaitUntil};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// spa-crawler: crawl a single-page application through a headless browser
///
/// Pages are rendered in Chromium so that client-side routes and content are
/// discovered, then written out as one JSON record per page.
#[derive(Parser, Debug)]
#[command(name = "spa-crawler")]
#[command(version = "1.0.0")]
#[command(about = "Crawl a JavaScript-rendered site", long_about = None)]
struct Cli {
    /// Starting URL of the application
    #[arg(long)]
    start_url: Option<String>,

    /// JSON file listing URLs to visit (e.g. a previous sitemap.json)
    #[arg(long, value_name = "PATH")]
    urls_file: Option<PathBuf>,

    /// Do not discover new links; only visit the provided URLs
    #[arg(long)]
    no_discover: bool,

    /// Path to the JSON output
    #[arg(long, value_name = "PATH", default_value = "outputs/sitemap.json")]
    out: PathBuf,

    /// Limit the crawl to the first URL's origin
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    same_origin: Option<bool>,

    /// Number of concurrent browser pages
    #[arg(long)]
    concurrency: Option<usize>,

    /// Maximum number of pages to visit
    #[arg(long)]
    max_pages: Option<usize>,

    /// Navigation timeout per page, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Run the browser without a window
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    headless: Option<bool>,

    /// When navigation counts as finished
    #[arg(long, value_enum)]
    wait_until: Option<WaitUntil>,

    /// Scrape title and text into the JSON output
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    scrape: Option<bool>,

    /// Also write every page into one Markdown file
    #[arg(long, value_name = "PATH")]
    markdown_out: Option<PathBuf>,

    /// CSS selector to wait for before extracting content
    #[arg(long)]
    wait_selector: Option<String>,

    /// Poll for text growth up to N milliseconds
    #[arg(long, value_name = "MS")]
    wait_text_growth_ms: Option<u64>,

    /// Include the rendered HTML of each page
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    include_html: Option<bool>,

    /// Retry timed-out URLs once with a doubled timeout
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    retry_failed: Option<bool>,

    /// Log page console warnings/errors and uncaught exceptions
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    log_console: Option<bool>,

    /// Log responses with status >= 400
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new(), num_args = 0..=1, default_missing_value = "true")]
    log_network: Option<bool>,

    /// Save a full-page screenshot of every visited page here
    #[arg(long, value_name = "DIR")]
    screenshot_dir: Option<PathBuf>,

    /// TOML file with crawl settings; flags override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file/default configuration
    fn apply_to(&self, config: &mut CrawlConfig) {
        if let Some(v) = self.same_origin {
            config.same_origin = v;
        }
        if let Some(v) = self.concurrency {
            config.concurrency = v;
        }
        if let Some(v) = self.max_pages {
            config.max_pages = v;
        }
        if let Some(v) = self.timeout_ms {
            config.timeout_ms = v;
        }
        if let Some(v) = self.headless {
            config.headless = v;
        }
        if let Some(v) = self.wait_until {
            config.wait_until = v;
        }
        if let Some(v) = self.scrape {
            config.scrape = v;
        }
        if let Some(v) = &self.wait_selector {
            config.wait_selector = Some(v.clone());
        }
        if let Some(v) = self.wait_text_growth_ms {
            config.wait_text_growth_ms = v;
        }
        if let Some(v) = self.include_html {
            config.include_html = v;
        }
        if let Some(v) = self.retry_failed {
            config.retry_failed = v;
        }
        if let Some(v) = self.log_console {
            config.log_console = v;
        }
        if let Some(v) = self.log_network {
            config.log_network = v;
        }
        if let Some(v) = &self.screenshot_dir {
            config.screenshot_dir = Some(v.clone());
        }
        if self.no_discover {
            config.discover_links = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if cli.start_url.is_none() && cli.urls_file.is_none() {
        usage_error(
            ErrorKind::MissingRequiredArgument,
            "You must provide either --start-url or --urls-file",
        );
    }

    // Load configuration, then let flags override it
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => CrawlConfig::default(),
    };
    cli.apply_to(&mut config);

    if let Err(e) = validate(&config) {
        usage_error(ErrorKind::ValueValidation, &e.to_string());
    }

    let seeds = resolve_seeds(&cli);
    tracing::info!("Crawling {} seed URL(s)", seeds.len());

    let report = crawl(config, &seeds).await.context("Crawl failed")?;

    write_json(&report.results, &cli.out)
        .with_context(|| format!("Failed to write {}", cli.out.display()))?;
    if let Some(md) = &cli.markdown_out {
        write_markdown(&report.results, md)
            .with_context(|| format!("Failed to write {}", md.display()))?;
    }

    if !report.failed_after_retry.is_empty() {
        tracing::warn!(
            "{} URL(s) still failed after retry:",
            report.failed_after_retry.len()
        );
        for url in &report.failed_after_retry {
            tracing::warn!("  {}", url);
        }
    }

    println!(
        "{}",
        summary_line(
            report.results.len(),
            &cli.out,
            cli.markdown_out.as_deref()
        )
    );

    Ok(())
}

/// Picks the seed list: URL-list file entries first, the single start URL otherwise
fn resolve_seeds(cli: &Cli) -> Vec<String> {
    let listed = match &cli.urls_file {
        Some(path) => match load_url_list(path) {
            Ok(urls) => urls,
            Err(e) => usage_error(ErrorKind::ValueValidation, &e.to_string()),
        },
        None => Vec::new(),
    };

    if !listed.is_empty() {
        return listed;
    }
    cli.start_url.iter().cloned().collect()
}

/// Prints a usage error and exits with clap's usage exit code
fn usage_error(kind: ErrorKind, message: &str) -> ! {
    Cli::command().error(kind, message).exit()
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spa_crawler=info,warn"),
            1 => EnvFilter::new("spa_crawler=debug,info"),
            2 => EnvFilter::new("spa_crawler=trace,debug"),
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
