pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod fs;
pub mod normalize;
pub mod pipeline;
pub mod store;
pub mod tickers;
pub(crate) mod tui;

pub use config::Config;
pub use error::{Error, ExtractError, FetchError, NormalizeError};
pub use pipeline::{Pipeline, RunSummary};

/// Shortcut for required API elements.
pub mod http {
    pub use reqwest::Client as HttpClient;
    pub use sqlx::SqlitePool;
}

/// Debug-log suffix for the time spent since `time`.
pub(crate) fn time_elapsed(time: std::time::Instant) -> String {
    format!(
        "\x1b[38;5;208melapsed time: {} ms\x1b[0m",
        time.elapsed().as_millis()
    )
}
