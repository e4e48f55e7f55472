//! `pswproxy validate`: check a configuration file without starting.
//!
//! The file goes through the same loader as `run`, then validation. The
//! outcome is a [`Report`], printed as text or as JSON for scripts. Flags
//! and environment variables are not applied, so the report describes the
//! file alone.

use std::path::Path;

use serde::Serialize;

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::model::ProxyConfig;
use crate::config::{self, validation};
use crate::error::{ProxyError, ValidationError};

#[derive(Debug, Serialize)]
pub struct Report {
    pub path: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ReportedError>,
}

/// What the proxy would do with this file.
#[derive(Debug, Serialize)]
pub struct ProxySummary {
    pub listen: String,
    pub upstream: String,
    /// `Host` sent upstream, or `None` when the client's is kept.
    pub host_header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportedError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl From<&ValidationError> for ReportedError {
    fn from(e: &ValidationError) -> Self {
        Self {
            field: e.field.clone(),
            message: e.message.clone(),
            suggestion: e.suggestion.clone(),
        }
    }
}

impl Report {
    #[must_use]
    pub fn new(path: &Path, config: &ProxyConfig) -> Self {
        Self::from_outcome(path, config, &validation::validate(config))
    }

    fn from_outcome(
        path: &Path,
        config: &ProxyConfig,
        outcome: &Result<(), Vec<ValidationError>>,
    ) -> Self {
        let path = path.display().to_string();
        match outcome {
            Ok(()) => Self {
                path,
                valid: true,
                proxy: Some(ProxySummary {
                    listen: format!("{}:{}", config.listen.host, config.listen.port),
                    upstream: config.upstream.to_string(),
                    host_header: config.change_origin.then(|| config.upstream.authority()),
                    admin: config
                        .admin
                        .port
                        .map(|port| format!("{}:{port}", config.listen.host)),
                }),
                errors: Vec::new(),
            },
            Err(errors) => Self {
                path,
                valid: false,
                proxy: None,
                errors: errors.iter().map(ReportedError::from).collect(),
            },
        }
    }

    fn render_errors(&self) -> String {
        use std::fmt::Write;

        let mut out = format!("\u{2717} {} has {} errors\n", self.path, self.errors.len());
        for e in &self.errors {
            let _ = write!(out, "\n  {}: {}", e.field, e.message);
            if let Some(ref suggestion) = e.suggestion {
                let _ = write!(out, " ({suggestion})");
            }
        }
        out
    }
}

pub async fn execute(args: &ValidateArgs) -> Result<(), ProxyError> {
    let config = config::load_file(&args.config).await?;
    let outcome = validation::validate(&config);
    let report = Report::from_outcome(&args.config, &config, &outcome);

    match args.format {
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&report)
                    .map_err(|e| ProxyError::Io(std::io::Error::other(e)))?
            );
        }
        ValidateFormat::Text if report.valid => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&report.path, &config)
            );
        }
        ValidateFormat::Text => eprintln!("{}", report.render_errors()),
    }

    outcome.map_err(|errors| ProxyError::ConfigValidation { errors })
}
