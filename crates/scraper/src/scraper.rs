//! Fetch one post through the shared browser session and extract it.

use std::{future::Future, sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    sumariza_browser::{BrowserBackend, BrowserError, SessionManager, Surface},
    sumariza_config::{ScraperConfig, schema::DEFAULT_FETCH_URL},
    sumariza_extract::{Tweet, extract},
    tokio::time::Instant,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{error::ScrapeError, selectors::SelectorStore};

/// Anything that turns a post id into a record.
#[async_trait]
pub trait TweetSource: Send + Sync {
    async fn scrape(
        &self,
        tweet_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Tweet, ScrapeError>;
}

/// Fetch parameters of a [`TweetScraper`].
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// URL template; `{id}` is replaced by the post id.
    pub fetch_url: String,
    /// Bound on each visibility wait.
    pub wait_timeout: Duration,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self::from(&ScraperConfig::default())
    }
}

impl From<&ScraperConfig> for ScraperSettings {
    fn from(cfg: &ScraperConfig) -> Self {
        Self {
            fetch_url: cfg.fetch_url.clone(),
            wait_timeout: Duration::from_millis(cfg.wait_timeout_ms),
        }
    }
}

impl ScraperSettings {
    pub fn fetch_url_for(&self, tweet_id: &str) -> String {
        if self.fetch_url.contains("{id}") {
            self.fetch_url.replace("{id}", tweet_id)
        } else {
            DEFAULT_FETCH_URL.replace("{id}", tweet_id)
        }
    }
}

/// Post ids are non-empty runs of ASCII digits.
pub fn validate_tweet_id(tweet_id: &str) -> Result<(), ScrapeError> {
    if tweet_id.is_empty() || !tweet_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ScrapeError::InvalidInput(format!(
            "tweet id must be numeric, got {tweet_id:?}"
        )));
    }
    Ok(())
}

/// Navigates to a post, waits for it to render and extracts it.
pub struct TweetScraper<B: BrowserBackend> {
    session: SessionManager<B>,
    selectors: Arc<SelectorStore>,
    settings: ScraperSettings,
}

impl<B: BrowserBackend> TweetScraper<B> {
    pub fn new(
        session: SessionManager<B>,
        selectors: Arc<SelectorStore>,
        settings: ScraperSettings,
    ) -> Self {
        Self {
            session,
            selectors,
            settings,
        }
    }

    pub fn session(&self) -> &SessionManager<B> {
        &self.session
    }

    pub fn selectors(&self) -> &Arc<SelectorStore> {
        &self.selectors
    }

    /// Fetch the rendered page of `tweet_id` and extract it.
    ///
    /// The returned record has empty `username` and `url`; those belong to
    /// the caller's addressing and are filled in by the pipeline.
    pub async fn scrape(
        &self,
        tweet_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Tweet, ScrapeError> {
        validate_tweet_id(tweet_id)?;
        let url = self.settings.fetch_url_for(tweet_id);
        let html = self.fetch(&url, cancel).await.map_err(|e| {
            if e.is_startup() {
                warn!(tweet_id, error = %e, "browser unavailable");
            } else if !e.is_cancelled() {
                warn!(tweet_id, error = %e, "scrape failed");
            }
            ScrapeError::from(e)
        })?;

        let extraction = extract(&html).map_err(|e| {
            warn!(tweet_id, bytes = html.len(), "no tweet text in captured page");
            ScrapeError::from(e)
        })?;
        if extraction.partial {
            let missing: Vec<String> = extraction.missing.iter().map(ToString::to_string).collect();
            warn!(tweet_id, missing = ?missing, "partial data retrieved");
        }
        info!(tweet_id, partial = extraction.partial, "tweet scraped");
        Ok(extraction.into_tweet(tweet_id))
    }

    /// Run navigate, wait for the container, wait for the text and capture,
    /// stopping between steps once `cancel` fires.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String, BrowserError> {
        let selectors = self.selectors.current();
        let wait = self.settings.wait_timeout;

        self.session
            .run(cancel, |surface| async move {
                step(cancel, "navigate", surface.navigate(url)).await?;
                step(
                    cancel,
                    "wait_container",
                    surface.wait_visible(&selectors.tweet.container, wait),
                )
                .await?;
                step(
                    cancel,
                    "wait_text",
                    surface.wait_visible(&selectors.tweet.text, wait),
                )
                .await?;
                step(cancel, "capture", surface.capture_html()).await
            })
            .await
    }
}

/// One cancellable step with timing.
async fn step<T>(
    cancel: &CancellationToken,
    name: &'static str,
    action: impl Future<Output = Result<T, BrowserError>>,
) -> Result<T, BrowserError> {
    if cancel.is_cancelled() {
        debug!(step = name, "cancelled before step");
        return Err(BrowserError::Cancelled);
    }

    let started = Instant::now();
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(BrowserError::Cancelled),
        result = action => result,
    };
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match &result {
        Ok(_) => debug!(step = name, elapsed_ms, "scrape step done"),
        Err(e) if e.is_cancelled() => debug!(step = name, elapsed_ms, "scrape step cancelled"),
        Err(e) => warn!(step = name, elapsed_ms, error = %e, "scrape step failed"),
    }
    result
}

#[async_trait]
impl<B: BrowserBackend> TweetSource for TweetScraper<B> {
    async fn scrape(
        &self,
        tweet_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Tweet, ScrapeError> {
        TweetScraper::scrape(self, tweet_id, cancel).await
    }
}
