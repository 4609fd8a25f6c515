//! Post URL parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ScrapeError;

#[allow(clippy::expect_used)]
static TWEET_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:twitter\.com|x\.com|mobile\.twitter\.com)/([A-Za-z0-9_]+)/status/([0-9]+)",
    )
    .expect("tweet URL pattern is valid")
});

/// Username and id addressed by a post URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TweetRef {
    pub username: String,
    pub tweet_id: String,
}

impl TweetRef {
    /// Canonical origin URL of the post.
    pub fn canonical_url(&self) -> String {
        canonical_url(&self.username, &self.tweet_id)
    }
}

pub fn canonical_url(username: &str, tweet_id: &str) -> String {
    format!("https://x.com/{username}/status/{tweet_id}")
}

/// Parse `http(s)://{twitter.com,x.com,mobile.twitter.com}/{user}/status/{id}`.
///
/// Anything after the id (path segments, query, fragment) is ignored.
pub fn parse_tweet_url(url: &str) -> Result<TweetRef, ScrapeError> {
    let caps = TWEET_URL
        .captures(url.trim())
        .ok_or_else(|| ScrapeError::InvalidInput(format!("not a tweet URL: {url}")))?;
    Ok(TweetRef {
        username: caps[1].to_string(),
        tweet_id: caps[2].to_string(),
    })
}
