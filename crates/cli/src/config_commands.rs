use {
    anyhow::Result,
    clap::Subcommand,
    sumariza_config::{Severity, SumarizaConfig, validate},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the effective configuration (file, defaults and env overrides) as TOML.
    Show,
    /// Print where the config file is looked up.
    Path,
}

pub fn handle_config(action: &ConfigAction, config: &SumarizaConfig) -> Result<()> {
    match action {
        ConfigAction::Check { verbose } => check(config, *verbose),
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        },
        ConfigAction::Path => {
            match sumariza_config::find_config_file() {
                Some(path) => println!("{}", path.display()),
                None => {
                    eprintln!("No config file found.");
                    if let Some(dir) = sumariza_config::config_dir() {
                        eprintln!("Create one at {}", dir.join("sumariza.toml").display());
                    }
                },
            }
            Ok(())
        },
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config: &SumarizaConfig, verbose: bool) -> Result<()> {
    let result = validate(config);

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
            Severity::Info => CYAN,
        };
        eprintln!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message);
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}
