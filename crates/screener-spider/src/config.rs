use crate::error::Error;
use crate::fetch::RetryPolicy;
use crate::normalize::TierPolicy;
use dotenv::var;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Spacing the upstream tolerates before it starts blocking; `SCRAPE_DELAY` is never allowed
/// below it.
pub const MIN_SCRAPE_DELAY: Duration = Duration::from_millis(2_000);

const DEFAULT_SCRAPE_DELAY: f64 = 2.5;
const DEFAULT_QUOTE_URL: &str = "https://finviz.com/quote.ashx";
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Runtime settings for one ingestion run.
///
/// Built from the environment (and an optional `.env` file) by [`Config::from_env`]; tests and
/// embedders construct it directly, starting from [`Config::default`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum gap between the *starts* of two consecutive requests.
    pub scrape_delay: Duration,
    /// Fallback ticker file, read only when the store is empty.
    pub csv_path: PathBuf,
    /// SQLite store location.
    pub db_path: PathBuf,
    /// Quote page endpoint; the ticker is sent as the `t` query parameter.
    pub quote_url: String,
    pub user_agent: String,
    pub fetch_timeout: Duration,
    pub retry: RetryPolicy,
    /// Number of records written per store transaction.
    pub batch_size: usize,
    /// Where the raw intermediate artifact of a scrape is written.
    pub raw_output: PathBuf,
    pub tiers: TierPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scrape_delay: Duration::from_secs_f64(DEFAULT_SCRAPE_DELAY),
            csv_path: PathBuf::from("StockSource.csv"),
            db_path: PathBuf::from("stocks.db"),
            quote_url: DEFAULT_QUOTE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            batch_size: 1,
            raw_output: PathBuf::from("stock_data_latest.json"),
            tiers: TierPolicy::default(),
        }
    }
}

impl Config {
    /// Read every setting from the environment, falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, Error> {
        let defaults = Self::default();

        let mut scrape_delay = secs_var("SCRAPE_DELAY", DEFAULT_SCRAPE_DELAY)?;
        if scrape_delay < MIN_SCRAPE_DELAY {
            warn!(
                "SCRAPE_DELAY of {:?} is below the upstream minimum, raising it to {:?}",
                scrape_delay, MIN_SCRAPE_DELAY
            );
            scrape_delay = MIN_SCRAPE_DELAY;
        }

        let retry = RetryPolicy {
            max_attempts: parsed_var("FETCH_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            initial_backoff: secs_var(
                "FETCH_BACKOFF",
                defaults.retry.initial_backoff.as_secs_f64(),
            )?,
            max_backoff: secs_var("FETCH_BACKOFF_MAX", defaults.retry.max_backoff.as_secs_f64())?,
            multiplier: defaults.retry.multiplier,
        };
        if retry.max_attempts == 0 {
            return Err(Error::Configuration(
                "FETCH_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let batch_size: usize = parsed_var("BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(Error::Configuration(
                "BATCH_SIZE must be at least 1".to_string(),
            ));
        }

        let tiers = TierPolicy {
            mega: parsed_var("TIER_MEGA", defaults.tiers.mega)?,
            large: parsed_var("TIER_LARGE", defaults.tiers.large)?,
            mid: parsed_var("TIER_MID", defaults.tiers.mid)?,
            small: parsed_var("TIER_SMALL", defaults.tiers.small)?,
        };
        tiers.validate()?;

        let config = Self {
            scrape_delay,
            csv_path: parsed_var("CSV_PATH", defaults.csv_path)?,
            db_path: parsed_var("DB_PATH", defaults.db_path)?,
            quote_url: parsed_var("QUOTE_URL", defaults.quote_url)?,
            user_agent: parsed_var("USER_AGENT", defaults.user_agent)?,
            fetch_timeout: secs_var("FETCH_TIMEOUT", defaults.fetch_timeout.as_secs_f64())?,
            retry,
            batch_size,
            raw_output: parsed_var("RAW_OUTPUT", defaults.raw_output)?,
            tiers,
        };
        debug!("configuration loaded: {config:?}");

        Ok(config)
    }
}

// read `key`, parsing it into `T`; unset variables take `default`
fn parsed_var<T>(key: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|err| {
            Error::Configuration(format!("invalid value \"{raw}\" for {key}, error({err})"))
        }),
        Err(_) => Ok(default),
    }
}

// read `key` as a number of seconds
fn secs_var(key: &str, default: f64) -> Result<Duration, Error> {
    let secs: f64 = parsed_var(key, default)?;
    Duration::try_from_secs_f64(secs).map_err(|err| {
        Error::Configuration(format!("invalid duration {secs} for {key}, error({err})"))
    })
}
