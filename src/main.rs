use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coursekit::config::{CoursekitConfig, LoggingConfig};
use coursekit::pagination::{build_offset_page, calculate_offset, normalize_limit};
use coursekit::ratelimit::{Clock, ManualClock, RateLimitKey, RateLimitRegistry};

/// Operator tooling for Coursekit policies and listings.
#[derive(Debug, Parser)]
#[command(name = "coursekit", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration and print the effective policies
    Check,
    /// Replay a burst of calls against one rate limit policy
    Simulate {
        /// Policy name, e.g. `enroll`
        #[arg(long)]
        policy: String,
        /// Caller identity, e.g. a user id or client IP
        #[arg(long)]
        subject: String,
        /// Number of calls to make
        #[arg(long, default_value_t = 10)]
        calls: u32,
        /// Simulated time between calls
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Print offset pagination metadata for a listing
    Page {
        /// Listing name, e.g. `courses`
        #[arg(long)]
        listing: String,
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        page: i64,
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
        /// Total rows in the listing
        #[arg(long)]
        total: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CoursekitConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Coursekit {}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &cli.config {
        info!(path = %path.display(), "Configuration file loaded");
    }

    match cli.command {
        Command::Check => check(&config),
        Command::Simulate {
            policy,
            subject,
            calls,
            interval_ms,
        } => simulate(&config, &policy, &subject, calls, interval_ms),
        Command::Page {
            listing,
            page,
            limit,
            total,
        } => print_page(&config, &listing, page, limit, total),
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn check(config: &CoursekitConfig) -> anyhow::Result<()> {
    println!(
        "registry: capacity={} entry_ttl_ms={}",
        config.registry.capacity, config.registry.entry_ttl_ms
    );

    println!("policies:");
    for (name, policy) in config.policies.iter() {
        println!("  {:<24} {} per {} ms", name, policy.limit, policy.window_ms);
    }

    println!("listings:");
    for (name, bounds) in &config.listings {
        println!(
            "  {:<24} min={} max={} default={}",
            name, bounds.min, bounds.max, bounds.default
        );
    }

    info!("Configuration is valid");
    Ok(())
}

fn simulate(
    config: &CoursekitConfig,
    policy_name: &str,
    subject: &str,
    calls: u32,
    interval_ms: u64,
) -> anyhow::Result<()> {
    let policy = config
        .policies
        .get(policy_name)
        .with_context(|| format!("Unknown policy '{}'", policy_name))?;

    let clock = ManualClock::new(0);
    let registry = RateLimitRegistry::with_clock(&config.registry, clock.clone());
    let key = RateLimitKey::new(policy_name, subject).to_string();

    for call in 1..=calls {
        let now = clock.now_millis();
        let decision = registry.check_policy(&key, policy);
        if decision.allowed {
            println!("#{:<4} t={:>8}ms allowed  remaining={}", call, now, decision.remaining);
        } else {
            let retry_after_secs = decision.retry_after_secs(now);
            warn!(key = %key, retry_after_secs, "Call rejected");
            println!("#{:<4} t={:>8}ms rejected retry_after={}s", call, now, retry_after_secs);
        }
        clock.advance(interval_ms);
    }

    Ok(())
}

fn print_page(
    config: &CoursekitConfig,
    listing: &str,
    page: i64,
    limit: Option<i64>,
    total: u64,
) -> anyhow::Result<()> {
    let bounds = config
        .listing(listing)
        .with_context(|| format!("Unknown listing '{}'", listing))?;

    let limit = normalize_limit(limit, bounds);
    let offset = calculate_offset(page, limit);
    let shown = total.saturating_sub(offset).min(u64::from(limit));
    let items: Vec<u64> = (offset..offset + shown).collect();

    let envelope = build_offset_page(items, page, limit, total);
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
