use crate::config::toml_config::TomlConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "quarterly-risk")]
#[command(about = "Forecast penalty and late-filing trends and flag quarterly tax risk")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON log lines (overrides logging.json)
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve {
        /// Override server.listen_addr
        #[arg(long)]
        listen_addr: Option<String>,
    },
    /// Assess one input file (.json or .csv) and print the report
    Assess {
        /// Input file with quarters, penalties and late-filing percentages
        #[arg(short, long)]
        input: PathBuf,

        /// Print the full assessment including model estimates
        #[arg(long)]
        detailed: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

impl CliConfig {
    /// Loads the configuration file (or defaults) and applies command-line overrides.
    pub fn load_settings(&self) -> crate::Result<TomlConfig> {
        let mut settings = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if self.json_logs {
            settings.logging.json = true;
        }
        if let Command::Serve {
            listen_addr: Some(addr),
        } = &self.command
        {
            settings.server.listen_addr = addr.clone();
        }

        Ok(settings)
    }
}
