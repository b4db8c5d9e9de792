use crate::error::Error;
use crate::store::Store;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// One ticker to process, with whatever metadata the fallback file carried.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickerEntry {
    pub ticker: String,
    pub company: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
}

impl TickerEntry {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerSource {
    /// Re-scrape everything already tracked.
    Store,
    /// Cold start from the fallback file.
    Fallback,
}

#[derive(Debug, Deserialize)]
struct FallbackRow {
    #[serde(rename = "Ticker", alias = "Exchange:Ticker", alias = "ticker")]
    ticker: String,
    #[serde(rename = "Company", alias = "Name", alias = "company", default)]
    company: Option<String>,
    #[serde(rename = "Sector", default)]
    sector: Option<String>,
    #[serde(rename = "Industry Group", alias = "Industry", default)]
    industry: Option<String>,
}

/// The ordered, duplicate-free list of tickers for this run.
///
/// Tickers already in the store win; the fallback file is only read when the store is empty.
/// With neither, the run cannot start.
pub async fn resolve(store: &Store, csv_path: &Path) -> Result<(TickerSource, Vec<TickerEntry>), Error> {
    let tracked = match store.tickers().await {
        Ok(tracked) => tracked,
        Err(err) => {
            warn!("failed to read tracked tickers, treating the store as empty, error({err})");
            vec![]
        }
    };

    let tracked = dedup(tracked.into_iter().map(|ticker| TickerEntry::new(&ticker)));
    if !tracked.is_empty() {
        info!("resolved {} tracked tickers from the store", tracked.len());
        return Ok((TickerSource::Store, tracked));
    }

    debug!("store is empty; reading fallback tickers from {}", csv_path.display());
    let entries = read_fallback(csv_path).map_err(|err| {
        Error::Configuration(format!(
            "store is empty and the fallback file {} is unusable, error({err})",
            csv_path.display()
        ))
    })?;

    if entries.is_empty() {
        return Err(Error::Configuration(format!(
            "store is empty and the fallback file {} lists no tickers",
            csv_path.display()
        )));
    }

    info!("resolved {} tickers from {}", entries.len(), csv_path.display());
    Ok((TickerSource::Fallback, entries))
}

/// Read the fallback ticker file, in file order, without duplicates.
pub fn read_fallback(path: &Path) -> Result<Vec<TickerEntry>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut entries = vec![];
    for row in reader.deserialize::<FallbackRow>() {
        let row = row?;
        let ticker = canonical(&row.ticker);
        if ticker.is_empty() {
            continue;
        }
        entries.push(TickerEntry {
            ticker,
            company: row.company.filter(|s| !s.is_empty()),
            sector: row.sector.filter(|s| !s.is_empty()),
            industry: row.industry.filter(|s| !s.is_empty()),
        });
    }

    Ok(dedup(entries))
}

/// Upper-case, without any `EXCHANGE:` prefix.
pub fn canonical(raw: &str) -> String {
    let raw = raw.trim();
    let symbol = raw.rsplit_once(':').map_or(raw, |(_, symbol)| symbol);
    symbol.trim().to_uppercase()
}

// keeps the first occurrence of every ticker
fn dedup(entries: impl IntoIterator<Item = TickerEntry>) -> Vec<TickerEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.ticker.clone()))
        .collect()
}
