//! Time-bounded cache of extracted records, keyed by addressing URL path.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use {
    sumariza_config::CacheConfig,
    sumariza_extract::Tweet,
    tokio::time::Instant,
    tracing::debug,
};

/// Storage for scraped records.
pub trait TweetCache: Send + Sync {
    fn get(&self, username: &str, tweet_id: &str) -> Option<Tweet>;
    fn set(&self, username: &str, tweet_id: &str, tweet: Tweet);
}

/// Normalized key: `/{username}/status/{id}`.
pub fn cache_key(username: &str, tweet_id: &str) -> String {
    format!("/{username}/status/{tweet_id}")
}

struct Entry {
    tweet: Tweet,
    expires_at: Instant,
}

/// In-process cache with a fixed TTL.
///
/// Expired entries are dropped when read, and swept in bulk whenever a
/// write finds more than `sweep_threshold` entries. A zero TTL stores nothing.
pub struct MemoryCache {
    ttl: Duration,
    sweep_threshold: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, sweep_threshold: usize) -> Self {
        Self {
            ttl,
            sweep_threshold,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::from_secs(config.ttl_secs),
            config.sweep_threshold,
        )
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn sweep(&self) -> usize {
        sweep_locked(&mut self.lock(), Instant::now())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep_locked(entries: &mut HashMap<String, Entry>, now: Instant) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.expires_at > now);
    before - entries.len()
}

impl TweetCache for MemoryCache {
    fn get(&self, username: &str, tweet_id: &str) -> Option<Tweet> {
        let key = cache_key(username, tweet_id);
        let mut entries = self.lock();
        let entry = entries.get(&key)?;
        if entry.expires_at <= Instant::now() {
            entries.remove(&key);
            return None;
        }
        Some(entry.tweet.clone())
    }

    fn set(&self, username: &str, tweet_id: &str, tweet: Tweet) {
        if self.ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        let mut entries = self.lock();
        if entries.len() >= self.sweep_threshold {
            let removed = sweep_locked(&mut entries, now);
            if removed > 0 {
                debug!(removed, remaining = entries.len(), "swept expired cache entries");
            }
        }
        entries.insert(cache_key(username, tweet_id), Entry {
            tweet,
            expires_at: now + self.ttl,
        });
    }
}
