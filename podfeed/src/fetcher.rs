//! Feed fetching with timeout, retry and cooperative cancellation
//!
//! A [`FeedFetcher`] runs at most one fetch at a time: starting a new fetch
//! cancels the previous worker through its [`CancellationToken`]. Transient
//! network failures are retried with exponential backoff; cancellation is
//! checked before every attempt and raced against the backoff sleep, so a
//! superseded fetch aborts even mid-backoff.

use crate::error::{Error, Result};
use crate::models::Podcast;
use crate::rss;
use reqwest::Client;
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout for feed requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of retry attempts after the initial request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for exponential backoff
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Ceiling on any single backoff delay
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "PodCore/0.1 (podfeed RSS reader)";

/// How many episodes to keep after parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpisodeLimit {
    /// Keep every playable episode
    #[default]
    All,
    /// Keep only the first N episodes in feed order
    Latest(usize),
}

/// Callbacks fired by [`FeedFetcher::fetch_async`]
///
/// Exactly one of `on_success`/`on_error` fires per completed fetch;
/// a cancelled fetch fires neither. `on_complete` always fires when the
/// worker exits.
#[derive(Default)]
pub struct FetchCallbacks {
    pub on_success: Option<Box<dyn FnOnce(Podcast) + Send>>,
    pub on_error: Option<Box<dyn FnOnce(String) + Send>>,
    pub on_complete: Option<Box<dyn FnOnce() + Send>>,
}

struct CurrentFetch {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Fetches and parses one remote feed at a time
pub struct FeedFetcher {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    episode_limit: EpisodeLimit,
    current: Mutex<Option<CurrentFetch>>,
}

impl FeedFetcher {
    /// Create a fetcher with default settings
    pub fn new() -> Result<Self> {
        FetcherBuilder::default().build()
    }

    /// Create a builder for configuring the fetcher
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::default()
    }

    /// Cheap syntactic check: absolute http/https URL
    pub fn validate_url(url: &str) -> bool {
        match Url::parse(url) {
            Ok(parsed) => {
                matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
            }
            Err(_) => false,
        }
    }

    /// Whether a fetch worker is still running
    pub fn is_busy(&self) -> bool {
        self.current
            .lock()
            .map(|guard| {
                guard
                    .as_ref()
                    .map(|cur| !cur.handle.is_finished())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Cancel the in-flight fetch, if any
    pub fn cancel(&self) {
        if let Ok(guard) = self.current.lock() {
            if let Some(cur) = guard.as_ref() {
                debug!("Cancelling in-flight feed fetch");
                cur.token.cancel();
            }
        }
    }

    /// Fetch and parse a feed, cancelling any fetch already in flight
    ///
    /// The worker runs on the tokio runtime; callbacks fire from the worker
    /// task. See [`FetchCallbacks`] for the callback contract.
    pub fn fetch_async(&self, url: &str, mut callbacks: FetchCallbacks) {
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let client = self.client.clone();
        let timeout = self.timeout;
        let max_retries = self.max_retries;
        let backoff_base = self.backoff_base;
        let episode_limit = self.episode_limit;
        let url = url.to_string();

        let handle = tokio::spawn(async move {
            let result = fetch_inner(
                &client,
                timeout,
                max_retries,
                backoff_base,
                episode_limit,
                &url,
                &worker_token,
            )
            .await;

            match result {
                Ok(podcast) if !worker_token.is_cancelled() => {
                    info!(
                        episodes = podcast.episode_count(),
                        "Feed fetch succeeded: {url}"
                    );
                    if let Some(on_success) = callbacks.on_success.take() {
                        on_success(podcast);
                    }
                }
                Ok(_) => {
                    debug!("Feed fetch for {url} finished after cancellation, discarding");
                }
                Err(err) if err.is_cancelled() => {
                    debug!("Feed fetch for {url} cancelled");
                }
                Err(err) => {
                    warn!("Feed fetch failed for {url}: {err}");
                    if let Some(on_error) = callbacks.on_error.take() {
                        on_error(err.to_string());
                    }
                }
            }

            if let Some(on_complete) = callbacks.on_complete.take() {
                on_complete();
            }
        });

        // Replace the previous fetch, cancelling it first
        if let Ok(mut guard) = self.current.lock() {
            if let Some(previous) = guard.replace(CurrentFetch { token, handle }) {
                previous.token.cancel();
            }
        }
    }

    /// Fetch and parse a feed directly, without the callback surface
    pub async fn fetch(&self, url: &str) -> Result<Podcast> {
        let token = CancellationToken::new();
        self.fetch_with_token(url, &token).await
    }

    /// Fetch and parse a feed, observing an external cancellation token
    pub async fn fetch_with_token(&self, url: &str, token: &CancellationToken) -> Result<Podcast> {
        fetch_inner(
            &self.client,
            self.timeout,
            self.max_retries,
            self.backoff_base,
            self.episode_limit,
            url,
            token,
        )
        .await
    }
}

async fn fetch_inner(
    client: &Client,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    episode_limit: EpisodeLimit,
    url: &str,
    token: &CancellationToken,
) -> Result<Podcast> {
    if !FeedFetcher::validate_url(url) {
        return Err(Error::InvalidUrl(url.to_string()));
    }

    let body = fetch_with_retry(client, timeout, max_retries, backoff_base, url, token).await?;

    if token.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let mut podcast = rss::parse_feed(&body, url)?;

    if let EpisodeLimit::Latest(count) = episode_limit {
        podcast.episodes.truncate(count);
    }

    Ok(podcast)
}

/// One GET with per-request timeout, retried with exponential backoff
///
/// Total attempts = `max_retries + 1`. Permanent failures (4xx) are
/// surfaced immediately; cancellation aborts before each attempt and
/// interrupts the backoff sleep.
async fn fetch_with_retry(
    client: &Client,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    url: &str,
    token: &CancellationToken,
) -> Result<String> {
    for attempt in 0..=max_retries {
        if token.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match try_get(client, timeout, url).await {
            Ok(body) => return Ok(body),
            Err(err) => {
                if !err.is_transient() || attempt == max_retries {
                    return Err(err);
                }

                let delay = backoff_delay(backoff_base, attempt);
                warn!(
                    attempt = attempt + 1,
                    "Feed fetch attempt failed, retrying in {delay:?}: {err}"
                );

                tokio::select! {
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    Err(Error::Cancelled)
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    (base * factor).min(MAX_BACKOFF)
}

async fn try_get(client: &Client, timeout: Duration, url: &str) -> Result<String> {
    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status(status.as_u16()));
    }

    Ok(response.text().await?)
}

/// Builder for [`FeedFetcher`]
pub struct FetcherBuilder {
    client: Option<Client>,
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    episode_limit: EpisodeLimit,
    user_agent: String,
}

impl Default for FetcherBuilder {
    fn default() -> Self {
        Self {
            client: None,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            episode_limit: EpisodeLimit::All,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetcherBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client (shares connection pools)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retry attempts after the initial request
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff base delay (attempt N waits `base * 2^N`, capped)
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Keep all episodes or only the latest N
    pub fn episode_limit(mut self, limit: EpisodeLimit) -> Self {
        self.episode_limit = limit;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the fetcher
    pub fn build(self) -> Result<FeedFetcher> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder().user_agent(&self.user_agent).build()?,
        };

        Ok(FeedFetcher {
            client,
            timeout: self.timeout,
            max_retries: self.max_retries,
            backoff_base: self.backoff_base,
            episode_limit: self.episode_limit,
            current: Mutex::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(FeedFetcher::validate_url("https://example.com/feed.xml"));
        assert!(FeedFetcher::validate_url("http://example.com/rss"));
        assert!(!FeedFetcher::validate_url("ftp://example.com/feed.xml"));
        assert!(!FeedFetcher::validate_url("example.com/feed.xml"));
        assert!(!FeedFetcher::validate_url("not a url"));
        assert!(!FeedFetcher::validate_url(""));
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let base = Duration::from_secs(1);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 6), Duration::from_secs(60));
        assert_eq!(backoff_delay(base, 30), Duration::from_secs(60));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Status(503).is_transient());
        assert!(Error::Status(500).is_transient());
        assert!(!Error::Status(404).is_transient());
        assert!(!Error::NoEpisodes.is_transient());
        assert!(!Error::Cancelled.is_transient());
    }
}
