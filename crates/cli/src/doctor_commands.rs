//! `sumariza doctor`: environment and configuration audit.
//!
//! Prints a report with `[ok]`, `[warn]`, `[fail]` or `[info]` per item and
//! exits non-zero when anything failed.

use std::path::{Path, PathBuf};

use {
    anyhow::Result,
    sumariza_browser::{
        BrowserConfig, ChromiumBackend, SessionManager, SessionSettings, detect_browser,
        install_instructions,
    },
    sumariza_config::{Severity, SumarizaConfig, validate},
    sumariza_scraper::SelectorStore,
    tokio_util::sync::CancellationToken,
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Per-check result used to build the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Info => CYAN,
        }
    }
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct CheckItem {
    status: Status,
    message: String,
}

struct Section {
    title: String,
    items: Vec<CheckItem>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push(CheckItem {
            status,
            message: message.into(),
        });
    }

    fn count(&self, status: Status) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }
}

// ── Printing ────────────────────────────────────────────────────────────────

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for item in &section.items {
            let color = item.status.color();
            let label = item.status.label();
            eprintln!("  [{color}{label}{RESET}]  {}", item.message);
        }
        eprintln!();
        errors += section.count(Status::Fail);
        warnings += section.count(Status::Warn);
    }

    (errors, warnings)
}

pub async fn handle_doctor(explicit: Option<&Path>, launch: bool) -> Result<()> {
    eprintln!("{BOLD}sumariza doctor{RESET}");
    eprintln!("{BOLD}==============={RESET}\n");

    let (mut config_section, config) = check_config(explicit);
    check_semantics(&mut config_section, &config);

    let mut sections = vec![config_section, check_browser(&config), check_selectors(&config)];
    if launch {
        sections.push(check_launch(&config).await);
    }

    let (errors, warnings) = print_report(&sections);

    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

/// Locate and parse the config file. Falls back to defaults on any failure
/// so the remaining checks still run.
fn check_config(explicit: Option<&Path>) -> (Section, SumarizaConfig) {
    let path: Option<PathBuf> = explicit
        .map(Path::to_path_buf)
        .or_else(sumariza_config::find_config_file);
    let label = path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".into());
    let mut section = Section::new(format!("Config ({label})"));

    let mut config = match &path {
        Some(path) => match sumariza_config::load_config(path) {
            Ok(config) => {
                section.push(Status::Ok, "config file parsed");
                config
            },
            Err(e) => {
                section.push(Status::Fail, e.to_string());
                SumarizaConfig::default()
            },
        },
        None => {
            section.push(Status::Info, "no config file found, using defaults");
            SumarizaConfig::default()
        },
    };
    sumariza_config::apply_env_overrides(&mut config);

    if std::env::var_os(sumariza_config::ENV_CHROME_PATH).is_some() {
        section.push(
            Status::Info,
            format!("{} overrides browser.chrome_path", sumariza_config::ENV_CHROME_PATH),
        );
    }
    if std::env::var_os(sumariza_config::ENV_BROWSER_RESTRICTED).is_some() {
        section.push(
            Status::Info,
            format!(
                "{} sets browser.restricted = {}",
                sumariza_config::ENV_BROWSER_RESTRICTED,
                config.browser.restricted
            ),
        );
    }

    (section, config)
}

fn check_semantics(section: &mut Section, config: &SumarizaConfig) {
    let result = validate(config);
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "all values valid");
    }
    for d in &result.diagnostics {
        section.push(Status::from(d.severity), format!("{}: {}", d.path, d.message));
    }
}

fn check_browser(config: &SumarizaConfig) -> Section {
    let mut section = Section::new("Browser");

    match detect_browser(config.browser.chrome_path.as_deref()) {
        Some(found) => section.push(
            Status::Ok,
            format!("found {} (via {})", found.path.display(), found.source),
        ),
        None => {
            section.push(Status::Fail, "no Chrome/Chromium executable found");
            for line in install_instructions().lines().filter(|l| !l.trim().is_empty()) {
                section.push(Status::Info, line.trim());
            }
        },
    }

    let browser = &config.browser;
    section.push(
        Status::Info,
        format!(
            "headless: {}, restricted: {}, viewport: {}x{}",
            browser.headless, browser.restricted, browser.viewport_width, browser.viewport_height
        ),
    );
    section.push(
        Status::Info,
        format!("idle shutdown after {}s", browser.idle_timeout_secs),
    );
    section
}

fn check_selectors(config: &SumarizaConfig) -> Section {
    let mut section = Section::new("Selectors");
    match SelectorStore::from_optional(config.scraper.selectors_path.as_deref()) {
        Ok(store) => {
            let source = store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".into());
            section.push(Status::Ok, format!("loaded from {source}"));
            section.push(Status::Info, format!("container: {}", store.tweet_container()));
            section.push(Status::Info, format!("text: {}", store.tweet_text()));
        },
        Err(e) => section.push(Status::Fail, e.to_string()),
    }
    section
}

/// Start the browser, probe it through a lease, then stop it.
async fn check_launch(config: &SumarizaConfig) -> Section {
    let mut section = Section::new("Launch");
    let browser = BrowserConfig::from(&config.browser);
    let session = SessionManager::new(
        ChromiumBackend::new(browser.clone()),
        SessionSettings::from(&browser),
    );

    match session.acquire(&CancellationToken::new()).await {
        Ok(lease) => {
            drop(lease);
            section.push(Status::Ok, "browser started and answered the probe");
        },
        Err(e) => section.push(Status::Fail, e.to_string()),
    }
    session.shutdown().await;
    section
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn severities_map_to_statuses() {
        assert_eq!(Status::from(Severity::Error), Status::Fail);
        assert_eq!(Status::from(Severity::Warning), Status::Warn);
        assert_eq!(Status::from(Severity::Info), Status::Info);
    }

    #[test]
    fn section_counts() {
        let mut section = Section::new("x");
        section.push(Status::Ok, "a");
        section.push(Status::Fail, "b");
        section.push(Status::Fail, "c");
        assert_eq!(section.count(Status::Fail), 2);
        assert_eq!(section.count(Status::Warn), 0);
    }

    #[test]
    fn missing_explicit_config_fails_but_yields_defaults() {
        let (section, config) = check_config(Some(Path::new("/nonexistent/sumariza.toml")));
        assert_eq!(section.count(Status::Fail), 1);
        assert_eq!(config.browser.idle_timeout_secs, 300);
    }

    #[test]
    fn missing_selector_file_fails() {
        let mut config = SumarizaConfig::default();
        config.scraper.selectors_path = Some("/nonexistent/selectors.yaml".into());
        assert_eq!(check_selectors(&config).count(Status::Fail), 1);

        let section = check_selectors(&SumarizaConfig::default());
        assert_eq!(section.count(Status::Fail), 0);
    }
}
