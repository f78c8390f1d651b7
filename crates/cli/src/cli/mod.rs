pub mod config;
pub mod simulate;

use std::path::Path;

use clap::{Parser, Subcommand};

use sk_domain::config::Config;

/// SessionKeeper: session lifecycle tooling for telemetry correlation.
#[derive(Debug, Parser)]
#[command(name = "sessionkeeper", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Replay a scripted foreground/background timeline against the
    /// session engine and print the session id after every step.
    Simulate {
        /// Comma-separated steps: `access`, `background`, `foreground`,
        /// `advance:<duration>` (e.g. `advance:3h59m59s`).
        #[arg(long)]
        steps: String,
        /// Print one JSON object per step instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any issues.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `SK_CONFIG` (or
/// `sessionkeeper.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    let config_path =
        std::env::var("SK_CONFIG").unwrap_or_else(|_| "sessionkeeper.toml".into());
    let config = load_config_from(Path::new(&config_path))?;
    Ok((config, config_path))
}

/// Load a config file, falling back to defaults when it does not exist.
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    Config::load_or_default(path)
        .map_err(|e| anyhow::anyhow!("loading {}: {e}", path.display()))
}
