/// Config schema types (browser, scraper, cache).
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Desktop Chrome user agent sent by default, so pages render the same
/// markup a regular visitor gets.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Default page address template; `{id}` is replaced by the post id.
pub const DEFAULT_FETCH_URL: &str = "https://x.com/i/status/{id}";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SumarizaConfig {
    pub browser: BrowserConfig,
    pub scraper: ScraperConfig,
    pub cache: CacheConfig,
}

/// Browser process settings. Applied when the process starts; changing them
/// requires a restart of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Add the flags needed to run inside containers and other restricted
    /// environments (no sandbox, no shared-memory file system).
    pub restricted: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Idle time in seconds after which the browser process is shut down.
    pub idle_timeout_secs: u64,
    /// Default navigation timeout in milliseconds.
    pub navigation_timeout_ms: u64,
    /// Upper bound for the liveness probe run before every session hand-out.
    pub probe_timeout_ms: u64,
    /// User agent string; a desktop Chrome UA when not set.
    pub user_agent: Option<String>,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            restricted: false,
            viewport_width: 1280,
            viewport_height: 2000,
            idle_timeout_secs: 300,
            navigation_timeout_ms: 30_000,
            probe_timeout_ms: 2_000,
            user_agent: None,
            chrome_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// YAML selector file. Built-in selectors are used when not set.
    pub selectors_path: Option<PathBuf>,
    /// Reload the selector file when it changes on disk.
    pub watch_selectors: bool,
    /// How long to wait for the post container and text to become visible.
    pub wait_timeout_ms: u64,
    /// Page address template, `{id}` is replaced by the post id.
    pub fetch_url: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            selectors_path: None,
            watch_selectors: true,
            wait_timeout_ms: 20_000,
            fetch_url: DEFAULT_FETCH_URL.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Time-to-live of a cached record in seconds.
    pub ttl_secs: u64,
    /// Number of entries above which expired records are swept on insert.
    pub sweep_threshold: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            sweep_threshold: 1024,
        }
    }
}
