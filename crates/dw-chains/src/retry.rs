//! Exponential backoff, lifted from `HorizonClient::retry_request`.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::{ChainError, Result};

#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

pub async fn retry_request<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;

                if !e.is_retryable() || attempt >= config.max_retries {
                    match e.log_level() {
                        tracing::Level::ERROR => {
                            tracing::error!("request failed after {} attempts: {}", attempt, e)
                        }
                        tracing::Level::WARN => {
                            tracing::warn!("request failed after {} attempts: {}", attempt, e)
                        }
                        _ => tracing::info!("request failed after {} attempts: {}", attempt, e),
                    }
                    return Err(e);
                }

                debug!(
                    "request failed (attempt {}/{}), retrying in {}ms: {}",
                    attempt, config.max_retries, delay_ms, e
                );

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                delay_ms = ((delay_ms as f64) * config.backoff_multiplier) as u64;
                delay_ms = delay_ms.min(config.max_delay_ms);
            }
        }
    }
}

pub fn classify_timeout(context: impl Into<String>) -> ChainError {
    ChainError::DeadlineExceeded(context.into())
}
