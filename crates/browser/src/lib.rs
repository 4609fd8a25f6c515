//! One managed Chrome/Chromium process with a single page, shared by all
//! callers one at a time.
//!
//! # Features
//!
//! - **Lazy start**: the process is launched on first use
//! - **Health check**: every hand-out probes the page and restarts a dead browser
//! - **Idle shutdown**: the process stops after a period without use
//! - **Cancellation**: waiting for the page and in-flight steps honour a
//!   [`CancellationToken`](tokio_util::sync::CancellationToken)
//!
//! # Example
//!
//! ```ignore
//! use sumariza_browser::{BrowserConfig, ChromiumBackend, SessionManager, SessionSettings, Surface};
//!
//! let config = BrowserConfig::default();
//! let manager = SessionManager::new(ChromiumBackend::new(config.clone()), SessionSettings::from(&config));
//!
//! let html = manager
//!     .run(&cancel, |page| async move {
//!         page.navigate("https://example.com").await?;
//!         page.capture_html().await
//!     })
//!     .await?;
//! manager.shutdown().await;
//! ```

pub mod chromium;
pub mod detect;
pub mod error;
pub mod session;
pub mod surface;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use {
    chromium::{ChromiumBackend, ChromiumProcess},
    detect::{DetectedBrowser, DetectedBy, check_and_warn, detect_browser, install_instructions},
    error::BrowserError,
    session::{SessionLease, SessionManager, SessionPhase, SessionSettings},
    surface::{BrowserBackend, Surface},
    types::BrowserConfig,
};

/// The production session manager.
pub type ChromiumSession = SessionManager<ChromiumBackend>;
