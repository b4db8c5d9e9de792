use colored::Colorize;
use dialoguer::Confirm;
use screener_spider::store::Store;
use screener_spider::tickers::TickerSource;
use screener_spider::{Config, Pipeline, RunSummary};
use std::path::Path;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Create the store, or bring an existing one up to the current schema.
pub(crate) async fn init(tui: bool) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let store = Store::open(&config.db_path).await?;
    let rows = store.row_count().await?;

    info!("store ready at {}, {rows} rows", config.db_path.display());
    if tui {
        println!(
            "{} {} ({rows} rows)",
            "store ready:".green(),
            config.db_path.display()
        );
    }
    Ok(())
}

/// Resolve tickers, confirm, then scrape until done, interrupted or timed out.
pub(crate) async fn scrape(yes: bool, timeout: Option<u64>, tui: bool) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let delay = config.scrape_delay;
    let mut pipeline = Pipeline::new(config).await?;

    let (source, entries) = pipeline.resolve().await?;
    let estimate = delay.mul_f64(entries.len() as f64);
    let origin = match source {
        TickerSource::Store => "tracked in the store",
        TickerSource::Fallback => "from the fallback file",
    };
    info!(
        "{} tickers {origin}, estimated {:.1}h",
        entries.len(),
        estimate.as_secs_f64() / 3600.0
    );

    if tui && !yes {
        println!(
            "{} tickers {origin}, ~{:.1}h",
            entries.len().to_string().bold(),
            estimate.as_secs_f64() / 3600.0
        );
        let proceed = Confirm::new()
            .with_prompt("Continue?")
            .default(false)
            .interact()?;
        if !proceed {
            println!("{}", "cancelled".yellow());
            return Ok(());
        }
    }

    // interrupt or timeout flips the flag; the pipeline stops between tickers
    let (cancel, cancelled) = watch::channel(false);
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => warn!("interrupt received; stopping after the current ticker"),
            _ = deadline => warn!("timeout reached; stopping after the current ticker"),
        }
        cancel.send(true).ok();
    });

    let summary = pipeline.run(&entries, cancelled, tui).await?;
    report(&summary, tui);
    Ok(())
}

/// Re-normalize a raw artifact into the store.
pub(crate) async fn replay(path: &Path, tui: bool) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    debug!("replaying {} into {}", path.display(), config.db_path.display());
    let pipeline = Pipeline::new(config).await?;

    let summary = pipeline.replay(path).await?;
    report(&summary, tui);
    Ok(())
}

fn report(summary: &RunSummary, tui: bool) {
    info!("run summary: {summary:?}");
    if !tui {
        return;
    }

    let title = if summary.cancelled {
        "run cancelled".yellow().bold()
    } else {
        "run finished".green().bold()
    };
    println!("{title} in {:.1}s", summary.elapsed().as_secs_f64());
    println!("  {:<20} {}", "attempted", summary.attempted);
    println!("  {:<20} {}", "succeeded", summary.succeeded.to_string().green());
    println!("  {:<20} {}", "skipped (affiliate)", summary.skipped);
    println!(
        "  {:<20} {}",
        "permanently failed",
        summary.permanent_failures.to_string().red()
    );
    println!("  {:<20} {}", "failed", summary.failed.to_string().red());
    if summary.degraded_fields > 0 {
        println!(
            "  {:<20} {}",
            "degraded fields",
            summary.degraded_fields.to_string().yellow()
        );
    }
    if !summary.permanently_failed.is_empty() {
        println!("  {}", summary.permanently_failed.join(", ").dimmed());
    }
}
