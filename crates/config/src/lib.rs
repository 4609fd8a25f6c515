//! Configuration loading, env substitution, overrides and validation.
//!
//! Config files: `sumariza.toml`, `sumariza.yaml`, or `sumariza.json`
//! Searched in `./` then `~/.config/sumariza/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values, and
//! `SUMARIZA_CHROME_PATH` / `SUMARIZA_BROWSER_RESTRICTED` overrides.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        ConfigError, ENV_BROWSER_RESTRICTED, ENV_CHROME_PATH, apply_env_overrides, config_dir,
        discover_and_load, find_config_file, load_config,
    },
    schema::{BrowserConfig, CacheConfig, ScraperConfig, SumarizaConfig},
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
