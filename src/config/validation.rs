//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a resolved [`ProxyConfig`] for errors
//! such as an unparsable listen address, an empty upstream host, a path
//! prefix without a leading slash, zero timeouts, or an admin port that
//! collides with the proxy port. Returns every [`ValidationError`] found,
//! with suggestions where a fix is obvious.

use std::net::IpAddr;

use super::model::ProxyConfig;
use crate::error::ValidationError;

/// Validate a listen host. Returns `Ok(())` or a human-readable error.
pub fn validate_listen_host(host: &str) -> Result<(), String> {
    if host.is_empty() {
        return Err("host cannot be empty".into());
    }
    host.parse::<IpAddr>()
        .map(|_| ())
        .map_err(|_| format!("'{host}' is not an IP address"))
}

/// Validate an upstream hostname. Returns `Ok(())` or a human-readable error.
pub fn validate_upstream_host(host: &str) -> Result<(), String> {
    if host.is_empty() {
        return Err("host cannot be empty".into());
    }
    if host.contains("://") || host.contains('/') {
        return Err(format!("'{host}' looks like a URL, expected a bare hostname"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(format!("'{host}' contains whitespace"));
    }
    Ok(())
}

/// Validate an upstream path prefix. Returns `Ok(())` or a human-readable error.
pub fn validate_path_prefix(prefix: &str) -> Result<(), String> {
    if prefix.is_empty() {
        return Ok(());
    }
    if !prefix.starts_with('/') {
        return Err(format!("path prefix must start with '/' (did you mean '/{prefix}'?)"));
    }
    if prefix.contains(['?', '#']) {
        return Err("path prefix must not contain '?' or '#'".into());
    }
    Ok(())
}

pub fn validate(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_listen_host(&config.listen.host) {
        errors.push(ValidationError {
            field: "listen.host".into(),
            message: msg,
            suggestion: (config.listen.host == "localhost").then(|| "use '127.0.0.1'".into()),
        });
    }

    if let Err(msg) = validate_upstream_host(&config.upstream.host) {
        errors.push(ValidationError {
            field: "upstream.host".into(),
            message: msg,
            suggestion: config
                .upstream
                .host
                .contains("://")
                .then(|| "pass full URLs with --upstream".into()),
        });
    }

    if config.upstream.port == Some(0) {
        errors.push(ValidationError {
            field: "upstream.port".into(),
            message: "port cannot be 0".into(),
            suggestion: Some(format!(
                "omit it to use {}",
                config.upstream.protocol.default_port()
            )),
        });
    }

    if let Err(msg) = validate_path_prefix(&config.upstream.path_prefix) {
        let prefix = &config.upstream.path_prefix;
        errors.push(ValidationError {
            field: "upstream.path_prefix".into(),
            message: msg,
            suggestion: (!prefix.starts_with('/')).then(|| format!("did you mean '/{prefix}'?")),
        });
    }

    let timeouts = [
        ("timeouts.connect_ms", config.timeouts.connect_ms),
        ("timeouts.response_ms", config.timeouts.response_ms),
        ("timeouts.idle_ms", config.timeouts.idle_ms),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError {
                field: field.into(),
                message: "timeout must be greater than 0".into(),
                suggestion: None,
            });
        }
    }

    if config.max_body == Some(0) {
        errors.push(ValidationError {
            field: "max_body".into(),
            message: "body limit must be greater than 0".into(),
            suggestion: Some("omit it to allow bodies of any size".into()),
        });
    }

    if let Some(admin_port) = config.admin.port {
        if admin_port == config.listen.port && admin_port != 0 {
            errors.push(ValidationError {
                field: "admin.port".into(),
                message: format!("admin port {admin_port} collides with the proxy port"),
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &ProxyConfig) -> String {
    let mut lines = vec![
        format!(
            "  listen:   {}:{}",
            config.listen.host, config.listen.port
        ),
        format!("  upstream: {}", config.upstream),
        format!(
            "  host:     {}",
            if config.change_origin {
                format!("rewritten to {}", config.upstream.authority())
            } else {
                "preserved".to_string()
            }
        ),
        format!(
            "  timeouts: connect {}ms, response {}ms, idle {}ms",
            config.timeouts.connect_ms, config.timeouts.response_ms, config.timeouts.idle_ms
        ),
    ];
    if let Some(limit) = config.max_body {
        lines.push(format!("  body cap: {limit} bytes"));
    }
    if let Some(port) = config.admin.port {
        lines.push(format!("  admin:    {}:{port}/health", config.listen.host));
    }

    format!("{} is valid\n{}", path, lines.join("\n"))
}
