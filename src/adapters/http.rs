use crate::utils::error::Result;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

const USER_AGENT: &str = concat!("nextdns-blocklist/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPolicy {
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub max_retry_delay: Duration,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(1000),
            max_retry_delay: Duration::from_secs(60),
        }
    }
}

impl HttpPolicy {
    /// 指數退避：retry_delay * 2^attempt，上限為 max_retry_delay
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_delay
            .checked_mul(factor)
            .unwrap_or(self.max_retry_delay)
            .min(self.max_retry_delay)
    }

    fn delay_for(&self, attempt: u32, headers: Option<&HeaderMap>) -> Duration {
        headers
            .and_then(retry_after)
            .map(|delay| delay.min(self.max_retry_delay))
            .unwrap_or_else(|| self.backoff_delay(attempt))
    }
}

pub fn build_client(policy: &HttpPolicy) -> Result<Client> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(policy.timeout)
        .build()?;
    Ok(client)
}

/// Reads a `Retry-After` header given in seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Sends the request built by `make_request`, retrying transport errors,
/// 429 and 5xx responses. Any other response is handed back unchanged, so
/// callers still decide what a non-success status means.
pub async fn send_with_retry<F>(
    policy: &HttpPolicy,
    operation: &str,
    make_request: F,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0;
    loop {
        match make_request().send().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) || attempt >= policy.retry_attempts {
                    return Ok(response);
                }
                let delay = policy.delay_for(attempt, Some(response.headers()));
                tracing::warn!(
                    "🔄 {} returned {}, retrying in {:?} (attempt {}/{})",
                    operation,
                    status,
                    delay,
                    attempt + 1,
                    policy.retry_attempts
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if !is_retryable_error(&e) || attempt >= policy.retry_attempts {
                    return Err(e.into());
                }
                let delay = policy.delay_for(attempt, None);
                tracing::warn!(
                    "🔄 {} failed: {}, retrying in {:?} (attempt {}/{})",
                    operation,
                    e,
                    delay,
                    attempt + 1,
                    policy.retry_attempts
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}
