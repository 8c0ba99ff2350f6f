//! SitePulse main entry point
//!
//! Command-line interface for running site health audits and reading
//! back their results.

use anyhow::bail;
use clap::Parser;
use sitepulse::config::load_config_with_hash;
use sitepulse::crawler::Auditor;
use sitepulse::storage::CheckRecord;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SitePulse: automated website health auditing
///
/// Discovers a bounded set of crawlable pages from robots.txt and
/// sitemaps, audits each page for SEO defects, and reduces the crawl
/// into a 0..100 health score.
#[derive(Parser, Debug)]
#[command(name = "sitepulse")]
#[command(version)]
#[command(about = "Automated website health auditing", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run a new check against this site URL
    #[arg(long, value_name = "URL")]
    site: Option<String>,

    /// Show the status report for an existing check and exit
    #[arg(long, value_name = "CHECK_ID", conflicts_with = "site")]
    status: Option<i64>,

    /// Recompute the cached health score for an existing check and exit
    #[arg(long, value_name = "CHECK_ID", conflicts_with_all = ["site", "status"])]
    rescore: Option<i64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let auditor = Auditor::new(config, &config_hash)?;

    if let Some(check_id) = cli.status {
        handle_status(&auditor, check_id)?;
    } else if let Some(check_id) = cli.rescore {
        handle_rescore(&auditor, check_id)?;
    } else if let Some(site) = cli.site {
        handle_audit(&auditor, &site).await?;
    } else {
        bail!("nothing to do: pass --site URL, --status CHECK_ID, or --rescore CHECK_ID");
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitepulse=info,warn"),
            1 => EnvFilter::new("sitepulse=debug,info"),
            2 => EnvFilter::new("sitepulse=trace,debug"),
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

/// Runs a new check and prints its report
async fn handle_audit(auditor: &Auditor, site: &str) -> anyhow::Result<()> {
    println!("=== SitePulse Audit ===\n");
    println!("Site: {}\n", site);

    let check_id = auditor.start_check(site).await?;
    let check = auditor.check_status(check_id)?;
    print_check_report(&check);

    Ok(())
}

/// Prints the stored report for an existing check
fn handle_status(auditor: &Auditor, check_id: i64) -> anyhow::Result<()> {
    let check = auditor.check_status(check_id)?;
    print_check_report(&check);
    Ok(())
}

/// Recomputes the cached score out-of-band and prints the result
fn handle_rescore(auditor: &Auditor, check_id: i64) -> anyhow::Result<()> {
    auditor.recompute_health_score(check_id)?;
    let check = auditor.check_status(check_id)?;
    println!("✓ Health score recomputed for check {}\n", check_id);
    print_check_report(&check);
    Ok(())
}

fn print_check_report(check: &CheckRecord) {
    println!("Check #{} ({})", check.id, check.site_url);
    println!("  Status: {}", check.status);
    if let Some(message) = &check.error_message {
        println!("  Error: {}", message);
    }
    println!(
        "  URLs crawled: {} of {} crawlable",
        check.total_urls_crawled, check.total_urls_crawlable
    );
    println!(
        "  Discovery: sitemap {}, robots.txt {}",
        if check.used_sitemap { "used" } else { "not used" },
        if check.robots_checked {
            "consulted"
        } else {
            "unavailable"
        }
    );
    match check.health_score {
        Some(score) => println!("  Health score: {:.2}", score),
        None => println!("  Health score: not computed"),
    }
    println!(
        "  Issues: {} errors, {} warnings, {} notices",
        check.errors_count, check.warnings_count, check.notices_count
    );
    println!("  HTTP errors: {}", check.http_errors_count);
    if let Some(finished) = &check.finished_at {
        println!("  Finished: {}", finished);
    }
}
