//! `pswproxy health`: query the admin port of a running instance.
//!
//! Accepts `http://host:port`, `host:port`, or a URL already ending in
//! `/health`. A non-2xx answer or a body that is not a healthy
//! [`HealthResponse`] exits non-zero, so the command works as a container
//! health check.

use std::fmt::Write as _;
use std::time::Duration;

use http_body_util::BodyExt;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::cli::HealthArgs;
use crate::error::ProxyError;
use crate::health::HealthResponse;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn http_error(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> ProxyError {
    ProxyError::HttpRequest {
        source: source.into(),
    }
}

/// Normalize the admin address into the `/health` URI.
pub fn health_uri(raw: &str) -> Result<hyper::Uri, ProxyError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let full = if with_scheme.ends_with("/health") {
        with_scheme
    } else {
        format!("{with_scheme}/health")
    };
    full.parse().map_err(|e: hyper::http::uri::InvalidUri| ProxyError::UriParse {
        source: Box::new(e),
    })
}

pub async fn execute(args: HealthArgs) -> Result<(), ProxyError> {
    let uri = health_uri(&args.url)?;
    let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

    let req = hyper::Request::builder()
        .uri(uri.clone())
        .header(hyper::header::ACCEPT, "application/json")
        .body(http_body_util::Empty::<bytes::Bytes>::new())
        .map_err(http_error)?;

    let response = tokio::time::timeout(REQUEST_TIMEOUT, client.request(req))
        .await
        .map_err(|_| http_error(format!("no answer from {uri} within {REQUEST_TIMEOUT:?}")))?
        .map_err(http_error)?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map_err(http_error)?
        .to_bytes();

    if !status.is_success() {
        return Err(ProxyError::HealthCheckFailed(status));
    }

    if args.json {
        println!("{}", String::from_utf8_lossy(&body));
        return Ok(());
    }

    let health: HealthResponse = serde_json::from_slice(&body)
        .map_err(|e| http_error(format!("{uri} did not return a health report: {e}")))?;
    if health.status != "healthy" {
        return Err(http_error(format!("{uri} reports status '{}'", health.status)));
    }

    print!("{}", render(&health, &uri));
    Ok(())
}

fn render(health: &HealthResponse, uri: &hyper::Uri) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\u{2713} pswproxy {} is healthy ({uri})", health.version);
    let _ = writeln!(out, "  uptime:    {}", format_uptime(health.uptime_seconds));
    let _ = writeln!(
        out,
        "  upstream:  {} (Host {})",
        health.upstream.url,
        if health.upstream.change_origin {
            "rewritten"
        } else {
            "preserved"
        }
    );
    let _ = writeln!(
        out,
        "  requests:  {} forwarded, {} failed",
        health.stats.requests_forwarded, health.stats.requests_failed
    );
    out
}

fn format_uptime(seconds: u64) -> String {
    let (days, rem) = (seconds / 86_400, seconds % 86_400);
    let (hours, rem) = (rem / 3600, rem % 3600);
    let (minutes, secs) = (rem / 60, rem % 60);
    match (days, hours, minutes) {
        (0, 0, 0) => format!("{secs}s"),
        (0, 0, _) => format!("{minutes}m {secs}s"),
        (0, _, _) => format!("{hours}h {minutes}m"),
        _ => format!("{days}d {hours}h"),
    }
}
