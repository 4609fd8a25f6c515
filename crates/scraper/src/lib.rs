//! Post retrieval: URL parsing, the browser scrape sequence, hot-reloaded
//! selectors and a TTL cache in front of it all.
//!
//! ```ignore
//! let target = parse_tweet_url("https://x.com/jack/status/20")?;
//! let scraper = TweetScraper::new(session, Arc::new(SelectorStore::builtin()), settings);
//! let pipeline = TweetPipeline::new(Arc::new(scraper), Arc::new(MemoryCache::from_config(&cfg)));
//! let tweet = pipeline.get_ref(&target, &cancel).await?;
//! ```

pub mod cache;
pub mod error;
pub mod pipeline;
pub mod scraper;
pub mod selectors;
pub mod url;

pub use {
    cache::{MemoryCache, TweetCache, cache_key},
    error::ScrapeError,
    pipeline::TweetPipeline,
    scraper::{ScraperSettings, TweetScraper, TweetSource, validate_tweet_id},
    selectors::{SelectorConfig, SelectorError, SelectorStore, SelectorWatcher},
    url::{TweetRef, canonical_url, parse_tweet_url},
};
