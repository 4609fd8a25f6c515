//! Browser error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("browser not available: Chrome/Chromium not found")]
    BrowserNotAvailable,

    /// The browser process or its first page could not be started.
    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("JavaScript evaluation failed: {0}")]
    JsEvalFailed(String),

    #[error("document capture failed: {0}")]
    CaptureFailed(String),

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BrowserError {
    /// Whether the error happened while bringing the session up.
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::BrowserNotAvailable | Self::LaunchFailed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        BrowserError::Cdp(err.to_string())
    }
}
