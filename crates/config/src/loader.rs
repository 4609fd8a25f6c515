use std::path::{Path, PathBuf};

use {
    thiserror::Error,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::SumarizaConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "sumariza.toml",
    "sumariza.yaml",
    "sumariza.yml",
    "sumariza.json",
];

/// Overrides the browser executable path.
pub const ENV_CHROME_PATH: &str = "SUMARIZA_CHROME_PATH";
/// Enables the restricted-environment browser flags (`1`/`true`/`yes`/`on`).
pub const ENV_BROWSER_RESTRICTED: &str = "SUMARIZA_BROWSER_RESTRICTED";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config format: .{0}")]
    UnsupportedFormat(String),
}

/// Load config from the given path (any supported format).
///
/// `${ENV_VAR}` placeholders are substituted before parsing.
pub fn load_config(path: &Path) -> Result<SumarizaConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./sumariza.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/sumariza/sumariza.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SumarizaConfig::default()` if no config file is found. Env
/// overrides are applied in both cases.
pub fn discover_and_load() -> SumarizaConfig {
    let mut config = SumarizaConfig::default();
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => config = cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    apply_env_overrides(&mut config);
    config
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/sumariza/
    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/sumariza/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sumariza").map(|d| d.config_dir().to_path_buf())
}

/// Apply `SUMARIZA_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut SumarizaConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut SumarizaConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(path) = lookup(ENV_CHROME_PATH).filter(|p| !p.trim().is_empty()) {
        debug!(path = %path, "browser path overridden from environment");
        config.browser.chrome_path = Some(path);
    }

    if let Some(raw) = lookup(ENV_BROWSER_RESTRICTED) {
        match parse_flag(&raw) {
            Some(restricted) => config.browser.restricted = restricted,
            None => warn!(
                var = ENV_BROWSER_RESTRICTED,
                value = %raw,
                "ignoring unrecognized boolean"
            ),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<SumarizaConfig, ConfigError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        "json" => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}
