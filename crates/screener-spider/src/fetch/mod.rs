mod limiter;
mod retry;

pub use limiter::RateLimiter;
pub use retry::RetryPolicy;

use crate::config::Config;
use crate::error::{Error, FetchError};
use crate::http::HttpClient;
use reqwest::StatusCode;
use tracing::{debug, trace, warn};

/// Build the http client used for quote pages.
pub fn build_client(config: &Config) -> Result<HttpClient, Error> {
    reqwest::ClientBuilder::new()
        .user_agent(&config.user_agent)
        .timeout(config.fetch_timeout)
        .build()
        .map_err(|err| Error::Configuration(format!("failed to build http client, error({err})")))
}

/// Retrieves one quote page per ticker, spacing requests with a [`RateLimiter`] and retrying
/// transient failures under a [`RetryPolicy`].
#[derive(Debug)]
pub struct QuoteFetcher {
    http_client: HttpClient,
    quote_url: String,
    limiter: RateLimiter,
    policy: RetryPolicy,
}

impl QuoteFetcher {
    pub fn new(config: &Config) -> Result<Self, Error> {
        Ok(Self::with_client(
            build_client(config)?,
            &config.quote_url,
            RateLimiter::new(config.scrape_delay),
            config.retry.clone(),
        ))
    }

    pub fn with_client(
        http_client: HttpClient,
        quote_url: &str,
        limiter: RateLimiter,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            http_client,
            quote_url: quote_url.to_string(),
            limiter,
            policy,
        }
    }

    /// Fetch the raw quote page for `ticker`.
    ///
    /// Every attempt, retries included, waits for its own rate-limiter slot.
    pub async fn fetch(&mut self, ticker: &str) -> Result<String, FetchError> {
        let mut failed_attempts = 0;
        loop {
            self.limiter.acquire().await;
            trace!("fetching quote page for [{ticker}], attempt {}", failed_attempts + 1);

            let err = match self.attempt(ticker).await {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            failed_attempts += 1;
            if !self.policy.should_retry(&err, failed_attempts) {
                debug!("giving up on [{ticker}] after {failed_attempts} attempt(s)");
                return Err(err);
            }

            let backoff = self.policy.backoff(failed_attempts);
            warn!(
                "failed to fetch quote page for [{ticker}] (attempt {failed_attempts}/{}), \
                retrying in {backoff:?}, error({err})",
                self.policy.max_attempts
            );
            tokio::time::sleep(backoff).await;
        }
    }

    async fn attempt(&self, ticker: &str) -> Result<String, FetchError> {
        let response = self
            .http_client
            .get(&self.quote_url)
            .query(&[("t", ticker)])
            .send()
            .await
            .map_err(|err| transient(ticker, &err))?;

        if let Some(err) = classify_status(ticker, response.status()) {
            return Err(err);
        }

        response.text().await.map_err(|err| transient(ticker, &err))
    }
}

/// Map a response status onto the fetch error taxonomy; `None` for success.
///
/// 404/410 mean the upstream does not know the ticker. 408, 429 and 5xx are worth another try,
/// any other 4xx is not.
pub fn classify_status(ticker: &str, status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let err = match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => permanent(ticker, status),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => transient_status(ticker, status),
        status if status.is_server_error() => transient_status(ticker, status),
        status if status.is_client_error() => permanent(ticker, status),
        // unfollowed redirects and informational responses
        status => transient_status(ticker, status),
    };
    Some(err)
}

fn permanent(ticker: &str, status: StatusCode) -> FetchError {
    FetchError::Permanent {
        ticker: ticker.to_string(),
        status: status.as_u16(),
    }
}

fn transient_status(ticker: &str, status: StatusCode) -> FetchError {
    FetchError::Transient {
        ticker: ticker.to_string(),
        reason: format!("status({})", status.as_u16()),
    }
}

// timeouts, refused connections and truncated bodies
fn transient(ticker: &str, err: &reqwest::Error) -> FetchError {
    let reason = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    FetchError::Transient {
        ticker: ticker.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tickers_are_permanent() {
        for code in [404, 410, 400, 403] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = classify_status("ZZZZ", status).unwrap();
            assert_eq!(
                err,
                FetchError::Permanent {
                    ticker: "ZZZZ".to_string(),
                    status: code
                }
            );
        }
    }

    #[test]
    fn throttling_and_server_errors_are_transient() {
        for code in [408, 429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(classify_status("AAPL", status).unwrap().is_transient());
        }
    }

    #[test]
    fn success_is_not_an_error() {
        assert_eq!(classify_status("AAPL", StatusCode::OK), None);
    }
}
