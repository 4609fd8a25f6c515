//! Cache-first retrieval of posts.

use std::sync::Arc;

use {
    sumariza_extract::Tweet,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::{
    cache::TweetCache,
    error::ScrapeError,
    scraper::TweetSource,
    url::{TweetRef, canonical_url},
};

/// Looks a post up in the cache and scrapes it on a miss.
///
/// Only successful records are cached; every error reaches the caller and
/// the next request scrapes again.
pub struct TweetPipeline {
    source: Arc<dyn TweetSource>,
    cache: Option<Arc<dyn TweetCache>>,
}

impl TweetPipeline {
    pub fn new(source: Arc<dyn TweetSource>, cache: Arc<dyn TweetCache>) -> Self {
        Self {
            source,
            cache: Some(cache),
        }
    }

    /// A pipeline that always scrapes.
    pub fn uncached(source: Arc<dyn TweetSource>) -> Self {
        Self {
            source,
            cache: None,
        }
    }

    pub async fn get(
        &self,
        tweet_id: &str,
        username: &str,
        cancel: &CancellationToken,
    ) -> Result<Tweet, ScrapeError> {
        if let Some(cache) = &self.cache
            && let Some(tweet) = cache.get(username, tweet_id)
        {
            debug!(username, tweet_id, "cache hit");
            return Ok(tweet);
        }
        debug!(username, tweet_id, "cache miss, scraping");

        let mut tweet = self.source.scrape(tweet_id, cancel).await?;
        tweet.username = username.to_string();
        tweet.url = canonical_url(username, tweet_id);

        if let Some(cache) = &self.cache {
            cache.set(username, tweet_id, tweet.clone());
        }
        Ok(tweet)
    }

    pub async fn get_ref(
        &self,
        target: &TweetRef,
        cancel: &CancellationToken,
    ) -> Result<Tweet, ScrapeError> {
        self.get(&target.tweet_id, &target.username, cancel).await
    }
}
