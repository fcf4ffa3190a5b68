//! Shared blocking HTTP plumbing for the adapters.

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Browser User-Agent pool. Some upstreams reject non-browser agents.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
];

pub fn pick_user_agent<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0])
}

/// Blocking client with a per-request timeout.
pub fn build_client(provider: &str, timeout: Duration) -> Result<Client, DataError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENTS[0])
        .build()
        .map_err(|e| DataError::Network {
            provider: provider.to_string(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

pub(crate) fn transport_error(provider: &str, e: &reqwest::Error) -> DataError {
    DataError::Network {
        provider: provider.to_string(),
        reason: e.to_string(),
    }
}

/// Exponential backoff settings.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Issue the request built by `send` and decode JSON, retrying with exponential backoff on 429,
/// 5xx and transport errors. 403 trips `breaker` immediately.
///
/// A request that exhausts its retries counts as one breaker failure, however many
/// attempts it made.
pub(crate) fn get_json<T: DeserializeOwned>(
    provider: &str,
    send: impl Fn() -> reqwest::Result<Response>,
    breaker: Option<&CircuitBreaker>,
    policy: RetryPolicy,
) -> Result<T, DataError> {
    let allowed = || breaker.map_or(true, |b| b.is_allowed());

    let mut last_error = None;
    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.base_delay * 2u32.pow(attempt - 1);
            debug!(provider, attempt, ?delay, "retrying");
            std::thread::sleep(delay);
        }
        if !allowed() {
            return Err(DataError::CircuitBreakerTripped);
        }

        let resp = match send() {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                last_error = Some(transport_error(provider, &e));
                continue;
            }
            Err(e) => return Err(transport_error(provider, &e)),
        };

        let status = resp.status();
        if status == StatusCode::FORBIDDEN {
            if let Some(b) = breaker {
                b.trip();
                return Err(DataError::CircuitBreakerTripped);
            }
            return Err(DataError::HttpStatus {
                provider: provider.to_string(),
                status: status.as_u16(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            warn!(provider, retry_after_secs, "rate limited");
            last_error = Some(DataError::RateLimited {
                provider: provider.to_string(),
                retry_after_secs,
            });
            continue;
        }
        if status.is_server_error() {
            last_error = Some(DataError::HttpStatus {
                provider: provider.to_string(),
                status: status.as_u16(),
            });
            continue;
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                provider: provider.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.json::<T>().map_err(|e| {
            DataError::malformed(provider, format!("failed to decode response: {e}"))
        })?;
        if let Some(b) = breaker {
            b.record_success();
        }
        return Ok(body);
    }

    if let Some(b) = breaker {
        b.record_failure();
    }
    Err(last_error.unwrap_or_else(|| DataError::Network {
        provider: provider.to_string(),
        reason: "max retries exceeded".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn user_agent_comes_from_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&pick_user_agent(&mut rng)));
        }
    }

    #[test]
    fn user_agent_pick_varies() {
        let mut rng = StdRng::seed_from_u64(42);
        let picks: std::collections::HashSet<_> =
            (0..50).map(|_| pick_user_agent(&mut rng)).collect();
        assert!(picks.len() > 1);
    }
}
