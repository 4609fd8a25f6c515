mod config_commands;
mod doctor_commands;
mod scrape_commands;

use std::path::{Path, PathBuf};

use {
    clap::{Parser, Subcommand},
    sumariza_config::SumarizaConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(
    name = "sumariza",
    version,
    about = "Fetch posts from x.com through a headless browser"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./sumariza.toml, then ~/.config/sumariza/).
    #[arg(long, global = true, env = "SUMARIZA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one or more posts and print each as JSON on stdout.
    Scrape {
        /// Post URLs (x.com, twitter.com or mobile.twitter.com).
        #[arg(required = true)]
        urls: Vec<String>,
        /// Give up after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// One JSON object per line instead of pretty output.
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
    /// Check browser detection, selectors and configuration.
    Doctor {
        /// Also start the browser and probe it.
        #[arg(long, default_value_t = false)]
        launch: bool,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Logs go to stderr so stdout carries only scrape output.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load the explicit config file if one was given, otherwise discover one.
/// Environment overrides apply either way.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<SumarizaConfig> {
    match explicit {
        Some(path) => {
            let mut config = sumariza_config::load_config(path)?;
            sumariza_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(sumariza_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "sumariza starting");

    match cli.command {
        Commands::Scrape {
            ref urls,
            timeout_secs,
            compact,
        } => {
            let config = load_config(cli.config.as_deref())?;
            scrape_commands::handle_scrape(&config, urls, timeout_secs, compact).await
        },
        Commands::Doctor { launch } => {
            doctor_commands::handle_doctor(cli.config.as_deref(), launch).await
        },
        Commands::Config { ref action } => {
            let config = load_config(cli.config.as_deref())?;
            config_commands::handle_config(action, &config)
        },
    }
}
