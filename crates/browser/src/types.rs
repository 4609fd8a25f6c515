//! Runtime browser settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use sumariza_config::schema::DEFAULT_USER_AGENT;

/// Flags for containers and other restricted environments.
pub const RESTRICTED_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
];

/// Browser configuration, applied once when the process starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    pub headless: bool,
    /// Add [`RESTRICTED_ARGS`] to the launch flags.
    pub restricted: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Idle time after which the session shuts the process down.
    pub idle_timeout_secs: u64,
    pub navigation_timeout_ms: u64,
    /// Bound on the liveness probe run before each hand-out.
    pub probe_timeout_ms: u64,
    /// User agent string; [`DEFAULT_USER_AGENT`] when not set.
    pub user_agent: Option<String>,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::from(&sumariza_config::schema::BrowserConfig::default())
    }
}

impl From<&sumariza_config::schema::BrowserConfig> for BrowserConfig {
    fn from(cfg: &sumariza_config::schema::BrowserConfig) -> Self {
        Self {
            chrome_path: cfg.chrome_path.clone(),
            headless: cfg.headless,
            restricted: cfg.restricted,
            viewport_width: cfg.viewport_width,
            viewport_height: cfg.viewport_height,
            idle_timeout_secs: cfg.idle_timeout_secs,
            navigation_timeout_ms: cfg.navigation_timeout_ms,
            probe_timeout_ms: cfg.probe_timeout_ms,
            user_agent: cfg.user_agent.clone(),
            chrome_args: cfg.chrome_args.clone(),
        }
    }
}

impl BrowserConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Extra command-line flags passed at launch, in order.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--disable-extensions".to_string(),
            "--disable-background-networking".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--mute-audio".to_string(),
            format!("--user-agent={}", self.user_agent()),
        ];
        if self.restricted {
            args.extend(RESTRICTED_ARGS.iter().map(|a| (*a).to_string()));
        }
        args.extend(self.chrome_args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_config_schema() {
        let cfg = BrowserConfig::default();
        assert!(cfg.headless);
        assert!(!cfg.restricted);
        assert_eq!(cfg.idle_timeout(), Duration::from_secs(300));
        assert_eq!(cfg.user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn restricted_mode_adds_flags() {
        let plain = BrowserConfig::default().launch_args();
        assert!(plain.iter().any(|a| a == "--disable-gpu"));
        assert!(!plain.iter().any(|a| a == "--no-sandbox"));

        let restricted = BrowserConfig {
            restricted: true,
            chrome_args: vec!["--lang=pt-BR".into()],
            ..Default::default()
        }
        .launch_args();
        for flag in RESTRICTED_ARGS {
            assert!(restricted.iter().any(|a| a == flag), "missing {flag}");
        }
        assert_eq!(restricted.last().map(String::as_str), Some("--lang=pt-BR"));
    }

    #[test]
    fn custom_user_agent() {
        let cfg = BrowserConfig {
            user_agent: Some("sumariza-test".into()),
            ..Default::default()
        };
        assert!(cfg.launch_args().contains(&"--user-agent=sumariza-test".to_string()));
    }

    #[test]
    fn converts_from_file_config() {
        let file = sumariza_config::schema::BrowserConfig {
            restricted: true,
            probe_timeout_ms: 750,
            ..Default::default()
        };
        let cfg = BrowserConfig::from(&file);
        assert!(cfg.restricted);
        assert_eq!(cfg.probe_timeout(), Duration::from_millis(750));
    }
}
