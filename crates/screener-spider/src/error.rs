use thiserror::Error;

/// Failures of the ingestion pipeline.
///
/// [`Error::Configuration`], [`Error::Extract`] and a failed commit ([`Error::Store`]) end a run;
/// per-ticker fetch failures are counted in the run summary and never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable ticker source, or an invalid setting. Raised before any fetch.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The upstream page layout is no longer recognised.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar error: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
}

/// Why a quote page could not be retrieved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Timeouts, connection failures, 5xx and rate-limit responses; worth retrying.
    #[error("transient failure fetching [{ticker}], error({reason})")]
    Transient { ticker: String, reason: String },

    /// The upstream does not know the ticker (or refuses it for good); never retried.
    #[error("permanent failure fetching [{ticker}], status({status})")]
    Permanent { ticker: String, status: u16 },
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    pub fn ticker(&self) -> &str {
        match self {
            FetchError::Transient { ticker, .. } | FetchError::Permanent { ticker, .. } => ticker,
        }
    }
}

/// The document does not contain the snapshot structure at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unrecognised quote page for [{ticker}], error({reason})")]
pub struct ExtractError {
    pub ticker: String,
    pub reason: String,
}

/// One raw field could not be typed. The field becomes unknown; nothing else is affected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to normalize {label} = \"{raw}\", error({reason})")]
pub struct NormalizeError {
    pub label: String,
    pub raw: String,
    pub reason: String,
}
