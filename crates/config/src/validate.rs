//! Semantic checks on a loaded configuration.
//!
//! Parsing already rejects malformed files; these checks flag values that
//! parse fine but cannot work (zero timeouts, a fetch URL without an id
//! placeholder, a missing browser binary path).

use std::{fmt, path::Path};

use crate::schema::SumarizaConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "browser.idle_timeout_secs"
    pub path: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

pub fn validate(config: &SumarizaConfig) -> ValidationResult {
    let mut result = ValidationResult::default();
    let browser = &config.browser;

    if let Some(path) = &browser.chrome_path
        && !Path::new(path).exists()
    {
        result.push(
            Severity::Error,
            "browser.chrome_path",
            format!("{path} does not exist"),
        );
    }
    if browser.idle_timeout_secs == 0 {
        result.push(
            Severity::Warning,
            "browser.idle_timeout_secs",
            "0 shuts the browser down after every request",
        );
    }
    if browser.probe_timeout_ms == 0 {
        result.push(
            Severity::Error,
            "browser.probe_timeout_ms",
            "liveness probe needs a non-zero timeout",
        );
    }
    if browser.navigation_timeout_ms == 0 {
        result.push(
            Severity::Error,
            "browser.navigation_timeout_ms",
            "navigation needs a non-zero timeout",
        );
    }
    if !browser.headless {
        result.push(
            Severity::Info,
            "browser.headless",
            "a visible browser window will be opened",
        );
    }

    let scraper = &config.scraper;
    if scraper.wait_timeout_ms == 0 {
        result.push(
            Severity::Error,
            "scraper.wait_timeout_ms",
            "waiting for the post needs a non-zero timeout",
        );
    }
    if !scraper.fetch_url.contains("{id}") {
        result.push(
            Severity::Error,
            "scraper.fetch_url",
            "must contain the {id} placeholder",
        );
    }
    if let Some(path) = &scraper.selectors_path
        && !path.exists()
    {
        result.push(
            Severity::Error,
            "scraper.selectors_path",
            format!("{} does not exist", path.display()),
        );
    }

    if config.cache.enabled && config.cache.ttl_secs == 0 {
        result.push(
            Severity::Warning,
            "cache.ttl_secs",
            "0 disables caching",
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let result = validate(&SumarizaConfig::default());
        assert!(
            result.diagnostics.is_empty(),
            "default config should be clean, got: {:?}",
            result.diagnostics
        );
    }

    #[test]
    fn zero_timeouts_and_bad_template() {
        let mut config = SumarizaConfig::default();
        config.browser.probe_timeout_ms = 0;
        config.scraper.wait_timeout_ms = 0;
        config.scraper.fetch_url = "https://x.com/i/status/".into();
        config.cache.ttl_secs = 0;

        let result = validate(&config);
        assert!(result.has_errors());
        assert_eq!(result.count(Severity::Error), 3);
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn missing_binary_is_an_error() {
        let mut config = SumarizaConfig::default();
        config.browser.chrome_path = Some("/nonexistent/chrome-xyz".into());
        let result = validate(&config);
        let diag = &result.diagnostics[0];
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.path, "browser.chrome_path");
        assert!(diag.to_string().starts_with("error: browser.chrome_path"));
    }
}
