//! Core HTTP request forwarding handler.
//!
//! The [`forward_handler`] function is the Axum fallback that receives
//! every request on the proxy port and replays it against the single
//! configured upstream. Submodules handle URI composition ([`uri`]),
//! header construction ([`headers`]), and the idle-guarded streaming
//! response body ([`body`]).
//!
//! Request and response bodies are never collected: the inbound
//! [`Body`] is handed to the hyper client frame by frame and the upstream
//! `Incoming` body is wrapped and handed back to axum. Both legs carry an
//! idle deadline; the response-header deadline only covers the time after
//! the request body has been sent, so slow uploads are not cut short.

pub mod body;
pub mod headers;
pub mod uri;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;

use crate::server::AppState;

/// Why a request could not be relayed. Each variant maps to a gateway
/// status returned to the client; none of them affect other connections.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),

    #[error("failed to build upstream request: {0}")]
    BuildRequest(#[from] axum::http::Error),

    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("upstream request failed: {}", error_chain(.0))]
    Upstream(#[source] hyper_util::client::legacy::Error),
}

impl ForwardError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream(e) => upstream_status(e),
            Self::InvalidUri(_) | Self::BuildRequest(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Failures of the inbound body surface inside the client error, so the
/// source chain decides whether the client or the upstream is at fault.
fn upstream_status(err: &hyper_util::client::legacy::Error) -> StatusCode {
    if has_source::<LengthLimitError>(err, |_| true) {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if has_source::<body::IdleTimeoutElapsed>(err, |_| true) {
        StatusCode::REQUEST_TIMEOUT
    } else if has_source::<std::io::Error>(err, |io| io.kind() == std::io::ErrorKind::TimedOut) {
        // Connect timeouts from the connector
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::BAD_GATEWAY
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, status.canonical_reason().unwrap_or("Gateway Error")).into_response()
    }
}

/// Render an error and all of its sources as `outer: inner: root`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

fn has_source<T: std::error::Error + 'static>(
    err: &(dyn std::error::Error + 'static),
    matches: impl Fn(&T) -> bool,
) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.downcast_ref::<T>().is_some_and(&matches) {
            return true;
        }
        source = cause.source();
    }
    false
}

#[allow(clippy::cast_possible_truncation)]
pub async fn forward_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    tracing::debug!(
        request_id = %request_id,
        client = %addr,
        method = %method,
        path = %path,
        "request received"
    );

    match forward(&state, addr, req).await {
        Ok(response) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                latency_ms = start.elapsed().as_millis() as u64,
                "upstream responded"
            );
            response
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = e.status().as_u16(),
                latency_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "upstream request failed"
            );
            e.into_response()
        }
    }
}

async fn forward(
    state: &AppState,
    client_addr: SocketAddr,
    req: Request,
) -> Result<Response, ForwardError> {
    let config = &state.config;
    let (parts, inbound) = req.into_parts();

    let upstream_uri = uri::upstream_uri(&config.upstream, &parts.uri)?;
    let forwarded_headers =
        headers::build_forwarded_headers(&parts.headers, client_addr.ip(), config);

    let idle = config.timeouts.idle();
    let (outbound_body, body_sent) = body::NotifyOnEnd::new(body::IdleTimeout::new(inbound, idle));

    let mut outbound = hyper::Request::builder()
        .method(parts.method)
        .uri(upstream_uri)
        .body(Body::new(outbound_body))?;
    *outbound.headers_mut() = forwarded_headers;

    // The response deadline starts once the request body is fully sent.
    // Until then the request body's own idle deadline applies.
    let timeout = config.timeouts.response();
    let mut pending = std::pin::pin!(state.http_client.request(outbound));
    let result = tokio::select! {
        result = &mut pending => Ok(result),
        _ = body_sent => tokio::time::timeout(timeout, &mut pending).await,
    };
    let upstream_response = result
        .map_err(|_| ForwardError::Timeout(timeout))?
        .map_err(ForwardError::Upstream)?;

    let (mut parts, incoming) = upstream_response.into_parts();
    headers::strip_hop_by_hop(&mut parts.headers);
    let streamed = Body::new(body::IdleTimeout::new(incoming, idle));

    Ok(Response::from_parts(parts, streamed))
}
