//! `pswproxy init`: generate a starter configuration file.
//!
//! The minimal template is the serialized default config; `--full`
//! writes a hand-documented template listing every option.

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::config::model::ProxyConfig;
use crate::error::ProxyError;

pub fn execute(args: &InitArgs) -> Result<(), ProxyError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("pswproxy.{}", args.format.extension())));

    if output.exists() {
        return Err(ProxyError::FileExists { path: output });
    }

    let content = render(&args.format, args.full)?;

    std::fs::write(&output, content)?;
    println!("Created {}", output.display());
    Ok(())
}

/// Render the starter config for `format`.
pub fn render(format: &ConfigFormat, full: bool) -> Result<String, ProxyError> {
    match (format, full) {
        (ConfigFormat::Yaml, true) => Ok(YAML_FULL.to_string()),
        (ConfigFormat::Json, true) => Ok(JSON_FULL.to_string()),
        (ConfigFormat::Toml, true) => Ok(TOML_FULL.to_string()),
        (format, false) => serialize_config(&ProxyConfig::default(), format),
    }
}

fn serialize_config(config: &ProxyConfig, format: &ConfigFormat) -> Result<String, ProxyError> {
    match format {
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => serde_yml::to_string(config)
            .map_err(|e| ProxyError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "yaml"))]
        ConfigFormat::Yaml => Err(ProxyError::UnsupportedFormat("yaml".into())),

        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| ProxyError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(feature = "toml")]
        ConfigFormat::Toml => toml::to_string_pretty(config)
            .map_err(|e| ProxyError::Io(std::io::Error::other(e.to_string()))),

        #[cfg(not(feature = "toml"))]
        ConfigFormat::Toml => Err(ProxyError::UnsupportedFormat("toml".into())),
    }
}

const YAML_FULL: &str = r#"# pswproxy config
#
# All values shown are defaults. Flags and environment variables
# (see `pswproxy run --help`) override anything set here.

listen:
  host: "0.0.0.0"                    # Interface to bind
  port: 6749

upstream:
  protocol: https                    # http or https
  host: "pswww.slac.stanford.edu"
  # port: 443                        # Defaults to 80 / 443 by protocol
  # path_prefix: "/ws"               # Prepended to every forwarded path

# change_origin: true                # Rewrite Host to the upstream host
# xfwd: false                        # Add X-Forwarded-For/Proto/Host

# timeouts:
#   connect_ms: 10000                # Upstream TCP connect
#   response_ms: 30000               # Wait for upstream response headers
#   idle_ms: 60000                   # Max gap between response body chunks
#   pool_idle_secs: 30               # Close idle pooled upstream connections

# max_body: 52428800                 # Request body cap in bytes (unset = unlimited)

# admin:
#   port: 6750                       # Serve GET /health on this port
"#;

const JSON_FULL: &str = r#"{
  "listen": {
    "host": "0.0.0.0",
    "port": 6749
  },
  "upstream": {
    "protocol": "https",
    "host": "pswww.slac.stanford.edu",
    "port": 443,
    "path_prefix": ""
  },
  "change_origin": true,
  "xfwd": false,
  "timeouts": {
    "connect_ms": 10000,
    "response_ms": 30000,
    "idle_ms": 60000,
    "pool_idle_secs": 30
  },
  "admin": {
    "port": 6750
  }
}
"#;

const TOML_FULL: &str = r#"# pswproxy config
#
# All values shown are defaults. Flags and environment variables
# (see `pswproxy run --help`) override anything set here.

# change_origin = true
# xfwd = false
# max_body = 52428800

[listen]
host = "0.0.0.0"
port = 6749

[upstream]
protocol = "https"
host = "pswww.slac.stanford.edu"
# port = 443
# path_prefix = "/ws"

# [timeouts]
# connect_ms = 10000
# response_ms = 30000
# idle_ms = 60000
# pool_idle_secs = 30

# [admin]
# port = 6750
"#;
