//! Command-line surface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the kurohelper binary.
#[derive(Debug, Parser)]
#[command(
    name = "kurohelper",
    version,
    about = "Kurohelper interaction navigator"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "KUROHELPER_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve interactions read as JSON lines from stdin.
    Serve(Box<ServeArgs>),
    /// Decode a navigation token and print it as JSON.
    Decode(DecodeArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct DecodeArgs {
    /// Raw custom identifier, compact or legacy form.
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override how long cached results and sessions stay readable.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the per-store result capacity.
    #[arg(long = "cache-result-capacity", value_name = "COUNT")]
    pub cache_result_capacity: Option<u64>,

    /// Override the session index capacity.
    #[arg(long = "cache-session-capacity", value_name = "COUNT")]
    pub cache_session_capacity: Option<u64>,

    /// Override the interval between expiry sweeps.
    #[arg(long = "cache-sweep-interval-seconds", value_name = "SECONDS")]
    pub cache_sweep_interval_seconds: Option<u64>,

    /// Override the number of entries per result page.
    #[arg(long = "navigator-page-size", value_name = "COUNT")]
    pub navigator_page_size: Option<u64>,

    /// Override how long a search fetch may run before it is abandoned.
    #[arg(long = "navigator-fetch-timeout-seconds", value_name = "SECONDS")]
    pub navigator_fetch_timeout_seconds: Option<u64>,

    /// Override the JSON catalog file.
    #[arg(long = "catalog-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub catalog_path: Option<PathBuf>,
}
