//! The seams between the session manager and a concrete browser.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;

/// The single interactive browser context (a page/tab) that scrape steps run
/// against.
#[async_trait]
pub trait Surface: Send + Sync + 'static {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Wait until an element matching `selector` exists and is rendered
    /// (non-empty box, not hidden), or fail with [`BrowserError::Timeout`].
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Full serialized markup of the current document.
    async fn capture_html(&self) -> Result<String, BrowserError>;

    /// Cheap liveness check. Never errors: a dead surface answers `false`.
    async fn probe(&self) -> bool;

    /// Return to a blank state between uses.
    async fn reset(&self) -> Result<(), BrowserError>;
}

/// Starts and stops browser processes and opens their surface.
#[async_trait]
pub trait BrowserBackend: Send + Sync + 'static {
    type Process: Send + Sync + 'static;
    type Surface: Surface;

    async fn launch(&self) -> Result<Self::Process, BrowserError>;

    async fn open_surface(
        &self,
        process: &mut Self::Process,
    ) -> Result<Self::Surface, BrowserError>;

    /// Stop the process. Failures are logged, never returned.
    async fn terminate(&self, process: Self::Process);
}
