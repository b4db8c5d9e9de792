use crate::config::Config;
use crate::error::Error;
use crate::extract::{extract, Extracted, RawSnapshot};
use crate::fetch::QuoteFetcher;
use crate::normalize::{normalize, StockRecord};
use crate::store::Store;
use crate::tickers::{self, canonical, TickerEntry, TickerSource};
use crate::tui::Progress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Operator-facing outcome of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Tickers that reached an outcome; an abandoned in-flight ticker is not counted.
    pub attempted: usize,
    /// Records committed to the store.
    pub succeeded: usize,
    /// Tickers the upstream does not know.
    pub permanent_failures: usize,
    /// Tickers whose transient failures outlasted the retry policy.
    pub failed: usize,
    /// Affiliate listings without snapshot data.
    pub skipped: usize,
    /// Fields degraded to unknown across every record.
    pub degraded_fields: usize,
    pub elapsed_seconds: f64,
    pub cancelled: bool,
    pub permanently_failed: Vec<String>,
}

impl RunSummary {
    pub fn elapsed(&self) -> Duration {
        Duration::try_from_secs_f64(self.elapsed_seconds).unwrap_or_default()
    }
}

/// The raw intermediate artifact written after every scrape and consumed by replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawArtifact {
    pub scraped_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub total_stocks: usize,
    pub successful: usize,
    pub affiliates_skipped: usize,
    pub failed: usize,
    pub stocks: Vec<RawSnapshot>,
}

/// Drives tickers through fetch, extract, normalize and load, strictly one at a time.
///
/// Owns the only long-lived state of a run: the store connection and the fetcher (and with it
/// the rate limiter's last request time).
pub struct Pipeline {
    config: Config,
    fetcher: QuoteFetcher,
    store: Store,
}

impl Pipeline {
    pub async fn new(config: Config) -> Result<Self, Error> {
        let store = Store::open(&config.db_path).await?;
        let fetcher = QuoteFetcher::new(&config)?;
        Ok(Self::with_parts(config, fetcher, store))
    }

    pub fn with_parts(config: Config, fetcher: QuoteFetcher, store: Store) -> Self {
        Self {
            config,
            fetcher,
            store,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The tickers this run will process, in order.
    pub async fn resolve(&self) -> Result<(TickerSource, Vec<TickerEntry>), Error> {
        tickers::resolve(&self.store, &self.config.csv_path).await
    }

    /// Process `entries` in order until done or cancelled. A page layout change or a failed
    /// commit ends the run early with that error, after the artifact is written.
    ///
    /// Cancellation is checked between tickers and abandons an in-flight fetch; records already
    /// normalized are still committed. Per-ticker fetch failures are counted, never returned.
    pub async fn run(
        &mut self,
        entries: &[TickerEntry],
        mut cancel: watch::Receiver<bool>,
        tui: bool,
    ) -> Result<RunSummary, Error> {
        let time = Instant::now();
        let scraped_at = Utc::now();
        let progress = Progress::new(entries.len(), tui)?;
        let batch_size = self.config.batch_size.max(1);

        let mut summary = RunSummary::default();
        let mut pending: Vec<StockRecord> = Vec::with_capacity(batch_size);
        let mut raw_stocks = vec![];
        let mut fatal = None;

        info!("scraping {} tickers ...", entries.len());
        for entry in entries {
            if *cancel.borrow() {
                summary.cancelled = true;
                break;
            }
            let ticker = entry.ticker.as_str();
            progress.working_on(ticker);

            let fetched = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => {
                    warn!("cancelled while fetching [{ticker}]; abandoning it");
                    summary.cancelled = true;
                    break;
                }
                fetched = self.fetcher.fetch(ticker) => fetched,
            };
            summary.attempted += 1;

            let html = match fetched {
                Ok(html) => html,
                Err(err) => {
                    error!("failed to fetch quote page for [{ticker}], error({err})");
                    if err.is_transient() {
                        summary.failed += 1;
                    } else {
                        summary.permanent_failures += 1;
                        summary.permanently_failed.push(ticker.to_string());
                    }
                    progress.failed();
                    continue;
                }
            };

            let raw = match extract(ticker, &html) {
                Ok(Extracted::Snapshot(raw)) => with_fallback_metadata(raw, entry),
                Ok(Extracted::Affiliate) => {
                    info!("skipping affiliate listing [{ticker}]");
                    summary.skipped += 1;
                    progress.skipped();
                    continue;
                }
                Err(err) => {
                    error!("failed to extract quote page for [{ticker}], error({err})");
                    fatal = Some(Error::from(err));
                    break;
                }
            };

            let record = normalize(&raw, &self.config.tiers);
            debug!(
                "normalized [{ticker}] {}, {} of {} columns known",
                record.company_name.as_deref().unwrap_or("-"),
                record.known_count(),
                record.values.len()
            );
            summary.degraded_fields += record.issues.len();
            raw_stocks.push(raw);
            pending.push(record);
            progress.succeeded();

            if pending.len() >= batch_size {
                match self.flush(&mut pending).await {
                    Ok(count) => summary.succeeded += count,
                    Err(err) => {
                        fatal = Some(err);
                        break;
                    }
                }
            }
        }

        match self.flush(&mut pending).await {
            Ok(count) => summary.succeeded += count,
            Err(err) if fatal.is_none() => fatal = Some(err),
            Err(_) => {}
        }
        progress.finish();
        summary.elapsed_seconds = time.elapsed().as_secs_f64();

        let complete = fatal.is_none() && !summary.cancelled;
        self.write_artifact(scraped_at, entries.len(), &summary, raw_stocks, complete)
            .await;

        if let Some(err) = fatal {
            return Err(err);
        }

        self.store.record_run(&summary).await?;
        info!(
            "scraped {} of {} tickers, {}",
            summary.succeeded,
            entries.len(),
            crate::time_elapsed(time)
        );
        Ok(summary)
    }

    /// Re-normalize and load a raw artifact without touching the network.
    pub async fn replay(&self, path: &Path) -> Result<RunSummary, Error> {
        let time = Instant::now();
        let artifact: RawArtifact = crate::fs::read_json(path).await?;
        info!(
            "replaying {} raw records scraped at {}",
            artifact.stocks.len(),
            artifact.scraped_at
        );

        let mut summary = RunSummary::default();
        let mut pending = Vec::with_capacity(self.config.batch_size.max(1));
        for mut raw in artifact.stocks {
            raw.ticker = canonical(&raw.ticker);
            if raw.ticker.is_empty() {
                warn!("skipping raw record without a ticker");
                continue;
            }
            summary.attempted += 1;

            let record = normalize(&raw, &self.config.tiers);
            summary.degraded_fields += record.issues.len();
            pending.push(record);
            if pending.len() >= self.config.batch_size.max(1) {
                summary.succeeded += self.flush(&mut pending).await?;
            }
        }
        summary.succeeded += self.flush(&mut pending).await?;
        summary.elapsed_seconds = time.elapsed().as_secs_f64();

        self.store.record_run(&summary).await?;
        info!(
            "replayed {} records, {}",
            summary.succeeded,
            crate::time_elapsed(time)
        );
        Ok(summary)
    }

    // commit `pending` as one transaction, returning how many records were written
    async fn flush(&self, pending: &mut Vec<StockRecord>) -> Result<usize, Error> {
        if pending.is_empty() {
            return Ok(0);
        }
        match self.store.write_batch(pending).await {
            Ok(()) => {
                let count = pending.len();
                pending.clear();
                Ok(count)
            }
            Err(err) => {
                let tickers: Vec<_> = pending.iter().map(|r| r.ticker.as_str()).collect();
                error!("failed to write batch {tickers:?}, error({err})");
                Err(err)
            }
        }
    }

    async fn write_artifact(
        &self,
        scraped_at: DateTime<Utc>,
        total_stocks: usize,
        summary: &RunSummary,
        stocks: Vec<RawSnapshot>,
        complete: bool,
    ) {
        let artifact = RawArtifact {
            scraped_at,
            duration_seconds: summary.elapsed_seconds,
            total_stocks,
            successful: stocks.len(),
            affiliates_skipped: summary.skipped,
            failed: summary.failed + summary.permanent_failures,
            stocks,
        };
        let path = if complete {
            self.config.raw_output.clone()
        } else {
            partial_output(&self.config.raw_output)
        };
        match crate::fs::write_json(&path, &artifact).await {
            Ok(()) => debug!("raw artifact written to {}", path.display()),
            Err(err) => error!(
                "failed to write raw artifact to {}, error({err})",
                path.display()
            ),
        }
    }
}

// resolves once cancellation is requested; never, if it no longer can be
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Where a cancelled or aborted run leaves its artifact, so the last complete one survives.
///
/// `stock_data_latest.json` becomes `stock_data_latest.partial.json`.
pub fn partial_output(raw_output: &Path) -> PathBuf {
    raw_output.with_extension("partial.json")
}

// the fallback file fills descriptive gaps the page left
fn with_fallback_metadata(mut raw: RawSnapshot, entry: &TickerEntry) -> RawSnapshot {
    if raw.company.is_none() {
        raw.company = entry.company.clone();
    }
    if raw.sector.is_none() {
        raw.sector = entry.sector.clone();
    }
    if raw.industry.is_none() {
        raw.industry = entry.industry.clone();
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn fallback_metadata_only_fills_gaps() {
        let raw = RawSnapshot {
            ticker: "AAPL".to_string(),
            company: Some("Apple Inc".to_string()),
            sector: None,
            industry: Some("Consumer Electronics".to_string()),
            country: None,
            fields: BTreeMap::new(),
        };
        let entry = TickerEntry {
            ticker: "AAPL".to_string(),
            company: Some("Apple".to_string()),
            sector: Some("Technology".to_string()),
            industry: Some("Hardware".to_string()),
        };

        let raw = with_fallback_metadata(raw, &entry);
        assert_eq!(raw.company.as_deref(), Some("Apple Inc"));
        assert_eq!(raw.sector.as_deref(), Some("Technology"));
        assert_eq!(raw.industry.as_deref(), Some("Consumer Electronics"));
    }

    #[test]
    fn partial_artifacts_sit_next_to_the_complete_one() {
        assert_eq!(
            partial_output(Path::new("raw/stock_data_latest.json")),
            PathBuf::from("raw/stock_data_latest.partial.json")
        );
        assert_eq!(
            partial_output(Path::new("latest")),
            PathBuf::from("latest.partial.json")
        );
    }

    #[tokio::test]
    async fn cancellation_future_waits_for_the_flag() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), cancelled(&mut rx))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_sender_never_cancels() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let waited = tokio::time::timeout(Duration::from_secs(60), cancelled(&mut rx)).await;
        assert!(waited.is_err());
    }
}
