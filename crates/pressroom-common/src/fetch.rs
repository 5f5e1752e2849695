//! Shared HTTP client for article fetching.
//!
//! All page and media downloads go through [`FetchClient`] so that retry
//! counts, the browser User-Agent and the politeness delay are applied
//! uniformly across sources.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use reqwest::{Client, ClientBuilder};
use tracing::{debug, warn};

use crate::error::{PressroomError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MEDIA_TIMEOUT: Duration = Duration::from_secs(300);
const MAX_RETRIES: u32 = 3;

/// HTTP client with bounded retries and a random 3-7 s pause after each
/// request to stay under per-source rate limits.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    max_retries: u32,
    polite: bool,
}

impl FetchClient {
    pub fn new() -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            polite: true,
        })
    }

    /// Client without politeness delays, for tests and local fixtures.
    pub fn without_delays() -> Result<Self> {
        let mut c = Self::new()?;
        c.polite = false;
        Ok(c)
    }

    /// Fetch a page body as text, retrying transient failures up to
    /// `max_retries` times after the initial attempt.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.with_attempts(url, || self.try_get_text(url)).await
    }

    async fn with_attempts<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(v) => {
                    self.pause().await;
                    return Ok(v);
                }
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    warn!(url = %url, attempt, error = %e, "fetch failed, retrying");
                    attempt += 1;
                    self.pause().await;
                }
            }
        }
    }

    /// Download a media file (podcast audio). Uses a longer per-request
    /// timeout than page fetches and does not retry.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .timeout(MEDIA_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        debug!(url = %url, len = bytes.len(), "media downloaded");
        Ok(bytes.to_vec())
    }

    async fn try_get_text(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let body = resp.text().await?;
        if body.trim().is_empty() {
            return Err(PressroomError::Extraction(format!("empty response body: {url}")));
        }
        Ok(body)
    }

    async fn pause(&self) {
        if !self.polite {
            return;
        }
        let secs = rand::thread_rng().gen_range(3.0..7.0);
        tokio::time::sleep(Duration::from_secs_f64(secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn without_delays_disables_pause() {
        let c = FetchClient::without_delays().unwrap();
        assert!(!c.polite);
        assert_eq!(c.max_retries, MAX_RETRIES);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let c = FetchClient::without_delays().unwrap();
        let calls = AtomicU32::new(0);
        let body = c
            .with_attempts("https://stub.test/flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PressroomError::Extraction("down".to_string()))
                    } else {
                        Ok("recovered".to_string())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(body, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn three_retries_means_four_attempts() {
        let c = FetchClient::without_delays().unwrap();
        let calls = AtomicU32::new(0);
        let err = c
            .with_attempts("https://stub.test/down", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<String, _>(PressroomError::Extraction("down".to_string())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PressroomError::Extraction(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1 + MAX_RETRIES);
    }
}
