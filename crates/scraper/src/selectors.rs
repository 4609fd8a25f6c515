//! CSS selectors the scraper waits on, loadable from YAML and hot-reloaded.
//!
//! ```yaml
//! tweet:
//!   container: 'article[data-testid="tweet"]'
//!   text: '[data-testid="tweetText"]'
//!   timestamp: time
//! author:
//!   name: '[data-testid="User-Name"]'
//!   handle: '[data-testid="User-Name"] a[role="link"]'
//!   avatar: '[data-testid="Tweet-User-Avatar"] img'
//!   verified_badge: '[data-testid="icon-verified"]'
//! quote:
//!   container: '[data-testid="quoteTweet"]'
//!   text: '[data-testid="quoteTweet"] [data-testid="tweetText"]'
//! ```
//!
//! Only the `tweet` section drives the scraper's waits. The `author` and
//! `quote` sections are informational: they document the markers the
//! extractors match on and are parsed so existing selector files load, but
//! changing them does not change extraction.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock, Weak},
    time::Duration,
};

use {
    notify_debouncer_full::{
        DebounceEventResult, Debouncer, RecommendedCache, new_debouncer,
        notify::{EventKind, RecommendedWatcher, RecursiveMode},
    },
    serde::{Deserialize, Serialize},
    thiserror::Error,
    tracing::{debug, info, warn},
};

const DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("no selector file configured")]
    NoFile,

    #[error("failed to watch selector file: {0}")]
    Watch(#[from] notify_debouncer_full::notify::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweetSelectors {
    pub container: String,
    pub text: String,
    pub timestamp: String,
}

impl Default for TweetSelectors {
    fn default() -> Self {
        Self {
            container: r#"article[data-testid="tweet"]"#.into(),
            text: r#"[data-testid="tweetText"]"#.into(),
            timestamp: "time".into(),
        }
    }
}

/// Informational; extraction matches fixed markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorSelectors {
    pub name: String,
    pub handle: String,
    pub avatar: String,
    pub verified_badge: String,
}

impl Default for AuthorSelectors {
    fn default() -> Self {
        Self {
            name: r#"[data-testid="User-Name"]"#.into(),
            handle: r#"[data-testid="User-Name"] a[role="link"]"#.into(),
            avatar: r#"[data-testid="Tweet-User-Avatar"] img"#.into(),
            verified_badge: r#"[data-testid="icon-verified"]"#.into(),
        }
    }
}

/// Informational; extraction matches fixed markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteSelectors {
    pub container: String,
    pub text: String,
}

impl Default for QuoteSelectors {
    fn default() -> Self {
        Self {
            container: r#"[data-testid="quoteTweet"]"#.into(),
            text: r#"[data-testid="quoteTweet"] [data-testid="tweetText"]"#.into(),
        }
    }
}

/// One complete selector set. Sections or keys missing from a file keep
/// their built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub tweet: TweetSelectors,
    pub author: AuthorSelectors,
    pub quote: QuoteSelectors,
}

impl SelectorConfig {
    /// Parse a YAML selector file body. The two selectors the scraper waits
    /// on must not be blank.
    pub fn from_yaml(raw: &str) -> Result<Self, String> {
        let config: Self = serde_yaml::from_str(raw).map_err(|e| e.to_string())?;
        if config.tweet.container.trim().is_empty() {
            return Err("tweet.container is empty".into());
        }
        if config.tweet.text.trim().is_empty() {
            return Err("tweet.text is empty".into());
        }
        Ok(config)
    }
}

/// Thread-safe holder of the current [`SelectorConfig`].
///
/// Readers take a cheap `Arc` snapshot; a reload swaps the whole set at
/// once, so a scrape never mixes selectors from two file versions.
#[derive(Debug)]
pub struct SelectorStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<SelectorConfig>>,
}

impl Default for SelectorStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SelectorStore {
    /// Built-in selectors, no backing file.
    pub fn builtin() -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(SelectorConfig::default())),
        }
    }

    /// Load selectors from `path`. Unlike [`reload`](Self::reload), a bad
    /// file here is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SelectorError> {
        let path = path.into();
        let config = read_file(&path)?;
        info!(path = %path.display(), "loaded selectors");
        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Load from `path` when given, else use the built-in set.
    pub fn from_optional(path: Option<&Path>) -> Result<Self, SelectorError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Arc<SelectorConfig> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn tweet_container(&self) -> String {
        self.current().tweet.container.clone()
    }

    pub fn tweet_text(&self) -> String {
        self.current().tweet.text.clone()
    }

    /// Re-read the backing file. On failure the previous set stays active.
    pub fn reload(&self) -> Result<(), SelectorError> {
        let Some(path) = &self.path else {
            return Err(SelectorError::NoFile);
        };
        match read_file(path) {
            Ok(config) => {
                let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
                if **current != config {
                    info!(path = %path.display(), "selectors reloaded");
                }
                *current = Arc::new(config);
                Ok(())
            },
            Err(e) => {
                warn!(error = %e, "selector reload failed, keeping previous selectors");
                Err(e)
            },
        }
    }

    /// Reload whenever the backing file changes. Events stop when the
    /// returned watcher or the store is dropped.
    pub fn watch(self: &Arc<Self>) -> Result<SelectorWatcher, SelectorError> {
        let Some(path) = self.path.clone() else {
            return Err(SelectorError::NoFile);
        };
        // Editors often replace the file, so watch its directory.
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(ToOwned::to_owned);
        let store: Weak<Self> = Arc::downgrade(self);

        let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let touched = events.iter().any(|event| {
                        matches!(
                            event.kind,
                            EventKind::Create(_) | EventKind::Modify(_)
                        ) && event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == file_name.as_deref())
                    });
                    if touched && let Some(store) = store.upgrade() {
                        debug!("selector file changed");
                        let _ = store.reload();
                    }
                },
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "selector watcher error");
                    }
                },
            }
        })?;
        debouncer.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %path.display(), "watching selectors");

        Ok(SelectorWatcher {
            _debouncer: debouncer,
        })
    }
}

fn read_file(path: &Path) -> Result<SelectorConfig, SelectorError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SelectorError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    SelectorConfig::from_yaml(&raw).map_err(|message| SelectorError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Keeps the file watcher alive.
pub struct SelectorWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}
