//! Configuration loading, layering, and validation.
//!
//! A [`ProxyConfig`] is assembled once at startup from three layers:
//! built-in defaults, an optional config file (YAML, JSON or TOML depending
//! on enabled features), and [`ConfigOverrides`] coming from flags and
//! environment variables. The result is validated and never mutated again.

pub mod model;
pub mod validation;

use std::path::Path;

use crate::error::{ProxyError, ValidationError};
use model::{ProxyConfig, Upstream};

/// Values supplied on the command line or through the environment.
/// `None` means "not given", so the file (or default) value wins.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub upstream: Option<String>,
    pub change_origin: Option<bool>,
    pub xfwd: Option<bool>,
    pub connect_timeout_ms: Option<u64>,
    pub response_timeout_ms: Option<u64>,
    pub idle_timeout_ms: Option<u64>,
    pub max_body: Option<usize>,
    pub admin_port: Option<u16>,
}

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<ProxyConfig, ProxyError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| ProxyError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| ProxyError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| ProxyError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(ProxyError::UnsupportedFormat(other.to_string())),
    }
}

/// Read and parse a config file. Validation is left to [`resolve`] so that
/// overrides can fix values the file gets wrong.
pub async fn load_file(path: &Path) -> Result<ProxyConfig, ProxyError> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProxyError::ConfigFileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProxyError::Io(e)
        }
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    parse_config_str(ext, &content, &path.display().to_string())
}

/// Layer `overrides` on top of `base` (file contents or defaults) and
/// validate the result.
pub fn resolve(
    base: Option<ProxyConfig>,
    overrides: &ConfigOverrides,
) -> Result<ProxyConfig, ProxyError> {
    let mut config = base.unwrap_or_default();

    if let Some(ref host) = overrides.host {
        config.listen.host.clone_from(host);
    }
    if let Some(port) = overrides.port {
        config.listen.port = port;
    }
    if let Some(ref raw) = overrides.upstream {
        config.upstream = Upstream::from_url(raw).map_err(|message| {
            ProxyError::ConfigValidation {
                errors: vec![ValidationError {
                    field: "upstream".into(),
                    message,
                    suggestion: Some("expected e.g. https://pswww.slac.stanford.edu".into()),
                }],
            }
        })?;
    }
    if let Some(change_origin) = overrides.change_origin {
        config.change_origin = change_origin;
    }
    if let Some(xfwd) = overrides.xfwd {
        config.xfwd = xfwd;
    }
    if let Some(ms) = overrides.connect_timeout_ms {
        config.timeouts.connect_ms = ms;
    }
    if let Some(ms) = overrides.response_timeout_ms {
        config.timeouts.response_ms = ms;
    }
    if let Some(ms) = overrides.idle_timeout_ms {
        config.timeouts.idle_ms = ms;
    }
    if overrides.max_body.is_some() {
        config.max_body = overrides.max_body;
    }
    if overrides.admin_port.is_some() {
        config.admin.port = overrides.admin_port;
    }

    validation::validate(&config).map_err(|errors| ProxyError::ConfigValidation { errors })?;
    Ok(config)
}
