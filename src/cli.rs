//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate, health), and their associated
//! argument structs. Running without a subcommand starts the proxy with
//! the top-level [`RunArgs`]. Every proxy flag has an environment
//! variable equivalent for container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ConfigOverrides;

#[derive(Parser)]
#[command(
    name = "pswproxy",
    version,
    about = "Single-upstream HTTP reverse proxy",
    propagate_version = true,
    args_conflicts_with_subcommands = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        pswproxy                                     Proxy :6749 to https://pswww.slac.stanford.edu\n  \
        pswproxy -u http://127.0.0.1:8080 -p 7557    Proxy :7557 to a local backend\n  \
        pswproxy init                                Create a starter config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server (the default)
    #[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        pswproxy run                                        Built-in defaults\n  \
        pswproxy run -c pswproxy.yaml                       Config file\n  \
        pswproxy run -u https://example.org --change-origin false\n  \
        pswproxy run --admin-port 6750 --pretty             Local dev mode")]
    Run(Box<RunArgs>),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),

    /// Check health of a running instance
    Health(HealthArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Config file path (.yaml, .json, .toml)
    #[arg(short, long, env = "PSWPROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen port [default: 6749]
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Listen address [default: 0.0.0.0]
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Upstream URL, e.g. https://pswww.slac.stanford.edu
    #[arg(short, long, env = "UPSTREAM_URL")]
    pub upstream: Option<String>,

    /// Rewrite the Host header to the upstream host [default: true]
    #[arg(long, env = "CHANGE_ORIGIN")]
    pub change_origin: Option<bool>,

    /// Add X-Forwarded-For/Proto/Host headers
    #[arg(long, env = "XFWD")]
    pub xfwd: bool,

    /// Port for the admin listener serving /health
    #[arg(long, env = "ADMIN_PORT")]
    pub admin_port: Option<u16>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Shorthand for --log-level debug
    #[arg(short, long)]
    pub verbose: bool,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Upstream connect timeout in milliseconds [default: 10000]
    #[arg(long, env = "CONNECT_TIMEOUT_MS", help_heading = "Tuning")]
    pub connect_timeout: Option<u64>,

    /// Wait for upstream response headers after the request body is sent, in milliseconds [default: 30000]
    #[arg(long, env = "RESPONSE_TIMEOUT_MS", help_heading = "Tuning")]
    pub response_timeout: Option<u64>,

    /// Max gap between body chunks, either direction, in milliseconds [default: 60000]
    #[arg(long, env = "IDLE_TIMEOUT_MS", help_heading = "Tuning")]
    pub idle_timeout: Option<u64>,

    /// Max request body size in bytes [default: unlimited]
    #[arg(long, env = "MAX_BODY_SIZE", help_heading = "Tuning")]
    pub max_body: Option<usize>,
}

impl RunArgs {
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            upstream: self.upstream.clone(),
            change_origin: self.change_origin,
            xfwd: self.xfwd.then_some(true),
            connect_timeout_ms: self.connect_timeout,
            response_timeout_ms: self.response_timeout,
            idle_timeout_ms: self.idle_timeout,
            max_body: self.max_body,
            admin_port: self.admin_port,
        }
    }
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        pswproxy init                             Minimal config (yaml)\n  \
        pswproxy init --full                      Every option, documented\n  \
        pswproxy init -f toml -o proxy.toml       TOML format")]
pub struct InitArgs {
    /// Output format
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Include full documentation as comments
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "pswproxy.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: ValidateFormat,
}

#[derive(Args)]
pub struct HealthArgs {
    /// Admin address of the running instance (host:port or URL)
    #[arg(default_value = "http://127.0.0.1:6750")]
    pub url: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Debug, Default, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum ValidateFormat {
    Text,
    Json,
}
