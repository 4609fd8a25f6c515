use {sumariza_browser::BrowserError, sumariza_extract::ExtractError, thiserror::Error};

/// Caller-visible failure of a scrape.
///
/// Browser step detail is logged, not carried: every navigation, wait or
/// capture failure surfaces as [`ScrapeError::ScrapingFailed`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("browser failed to start: {0}")]
    Startup(String),

    #[error("scrape cancelled")]
    Cancelled,

    #[error("failed to scrape tweet")]
    ScrapingFailed,

    #[error("essential tweet text not found")]
    EssentialTextNotFound,

    #[error("tweet not found or deleted")]
    NotFound,

    #[error("tweet is from a private account")]
    Private,
}

impl From<BrowserError> for ScrapeError {
    fn from(err: BrowserError) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else if err.is_startup() {
            Self::Startup(err.to_string())
        } else {
            Self::ScrapingFailed
        }
    }
}

impl From<ExtractError> for ScrapeError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::EssentialTextNotFound => Self::EssentialTextNotFound,
        }
    }
}
