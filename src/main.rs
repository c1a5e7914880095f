use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use sportyodds::config::{AppConfig, DEFAULT_CONFIG_PATH};
use sportyodds::monitoring::logger;
use sportyodds::scraper::cache::MatchCache;
use sportyodds::{Match, Scraper};

/// Print today's SportyBet football matches with 1X2, O/U 2.5 and BTTS odds.
#[derive(Debug, Parser)]
#[command(name = "sportyodds", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Skip the cache on the first fetch.
    #[arg(long)]
    force_refresh: bool,

    /// Keep running, fetching every N seconds.
    #[arg(long, value_name = "SECONDS")]
    watch: Option<u64>,

    /// Print one pretty JSON array instead of one match per line.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(&cli.config)?;

    logger::init_logging(&config.monitoring)?;
    config.apply_env_overrides();

    tracing::info!(
        base_url = %config.scraper.base_url,
        browser_profile = config.scraper.browser_profile,
        cache_ttl_s = config.scraper.cache_ttl_seconds,
        "sportyodds starting"
    );

    let cache = MatchCache::new(config.scraper.cache_ttl());
    let scraper = Scraper::from_config(&config.scraper, cache)?;

    match cli.watch {
        None => {
            let matches = scraper.get_today_matches(cli.force_refresh).await?;
            print_matches(&matches, cli.pretty)?;
        }
        Some(seconds) => run_watch(&scraper, &cli, Duration::from_secs(seconds.max(1))).await?,
    }

    Ok(())
}

/// Fetch on a fixed interval until interrupted. Failures are logged and the
/// loop carries on; the cache absorbs fetches inside its TTL.
async fn run_watch(scraper: &Scraper, cli: &Cli, interval: Duration) -> Result<()> {
    let mut force_refresh = cli.force_refresh;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted — shutting down");
                return Ok(());
            }
        }

        match scraper.get_today_matches(force_refresh).await {
            Ok(matches) => print_matches(&matches, cli.pretty)?,
            Err(e) => tracing::error!(
                kind = %e.kind(),
                retryable = e.is_retryable(),
                error = %e,
                "Fetch failed"
            ),
        }
        force_refresh = false;
    }
}

fn print_matches(matches: &[Match], pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(matches)?);
    } else {
        for m in matches {
            println!("{}", serde_json::to_string(m)?);
        }
    }
    Ok(())
}
