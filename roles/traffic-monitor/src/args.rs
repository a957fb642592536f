//! CLI argument parsing for the traffic monitor binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ConfigError, MonitorConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Traffic monitor for the v2ray/xray stats API", long_about = None)]
pub struct Args {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to the TOML configuration file",
        default_value = "traffic-monitor.toml"
    )]
    pub config_path: PathBuf,
    #[arg(
        short = 'f',
        long = "log-file",
        help = "Path to the log file. If not set, logs will only be written to stderr."
    )]
    pub log_file: Option<PathBuf>,
    #[arg(
        short = 'a',
        long = "api-address",
        help = "StatsService address, overrides [api].address"
    )]
    pub api_address: Option<String>,
    #[arg(long = "service-name", help = "gRPC service name, overrides [api].service_name")]
    pub service_name: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Poll continuously and print traffic tables (default)
    Watch,
    /// Print every counter once and exit
    Dump {
        /// Server-side filter, overrides [query].pattern
        #[arg(short, long)]
        pattern: Option<String>,
        /// Zero the counters after reading them
        #[arg(long)]
        reset: bool,
    },
    /// Print runtime statistics of the proxy process and exit
    Sys,
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch)
    }

    /// Load the config file and apply command line overrides.
    pub fn load_config(&self) -> Result<MonitorConfig, ConfigError> {
        let mut config = MonitorConfig::from_path(&self.config_path)?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut MonitorConfig) {
        if let Some(address) = &self.api_address {
            config.api.address = address.clone();
        }
        if let Some(service_name) = &self.service_name {
            config.api.service_name = service_name.clone();
        }
    }
}
