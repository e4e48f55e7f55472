//! Header forwarding, `Host` rewriting, and hop-by-hop stripping.
//!
//! [`build_forwarded_headers`] clones the client headers, strips
//! hop-by-hop headers (including any listed in `Connection`), rewrites
//! `Host` when change-origin is enabled, and optionally appends the
//! `X-Forwarded-*` family. Nothing else is touched.

use std::net::IpAddr;
use std::sync::LazyLock;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::model::ProxyConfig;

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "proxy-connection",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Remove hop-by-hop headers, plus any header the peer nominated as
/// connection-scoped through the `Connection` header.
///
/// `content-length` is kept: bodies are streamed, so the origin's length
/// still describes the bytes that will be written.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let nominated: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| name.trim().parse::<HeaderName>().ok())
        .collect();

    for name in nominated.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

pub fn build_forwarded_headers(
    original: &HeaderMap,
    client_ip: IpAddr,
    config: &ProxyConfig,
) -> HeaderMap {
    let mut headers = original.clone();
    strip_hop_by_hop(&mut headers);

    // Rewrite Host; otherwise the client's value passes through as-is
    if config.change_origin {
        match HeaderValue::from_str(&config.upstream.authority()) {
            Ok(val) => {
                headers.insert(header::HOST, val);
            }
            Err(e) => {
                tracing::warn!(host = %config.upstream.host, error = %e, "upstream host is not a valid header value");
            }
        }
    }

    if config.xfwd {
        let client_ip = client_ip.to_string();
        let xff = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map_or_else(
                || client_ip.clone(),
                |existing| format!("{existing}, {client_ip}"),
            );
        if let Ok(val) = HeaderValue::from_str(&xff) {
            headers.insert("x-forwarded-for", val);
        }

        // The listener only speaks plaintext
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));

        if let Some(original_host) = original.get(header::HOST) {
            headers.insert("x-forwarded-host", original_host.clone());
        }
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::Upstream;

    fn config(change_origin: bool, xfwd: bool) -> ProxyConfig {
        ProxyConfig {
            change_origin,
            xfwd,
            ..ProxyConfig::default()
        }
    }

    fn client() -> IpAddr {
        "10.0.0.1".parse().unwrap()
    }

    #[test]
    fn strips_hop_by_hop() {
        let mut original = HeaderMap::new();
        original.insert("connection", "keep-alive".parse().unwrap());
        original.insert("transfer-encoding", "chunked".parse().unwrap());
        original.insert("content-type", "application/json".parse().unwrap());
        original.insert("content-length", "2".parse().unwrap());

        let result = build_forwarded_headers(&original, client(), &config(true, false));

        assert!(result.get("connection").is_none());
        assert!(result.get("transfer-encoding").is_none());
        assert_eq!(result.get("content-type").unwrap(), "application/json");
        assert_eq!(result.get("content-length").unwrap(), "2");
    }

    #[test]
    fn strips_headers_nominated_by_connection() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", "close, X-Session-Hint".parse().unwrap());
        headers.insert("x-session-hint", "abc".parse().unwrap());
        headers.insert("accept", "*/*".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert!(headers.get("x-session-hint").is_none());
        assert_eq!(headers.get("accept").unwrap(), "*/*");
    }

    #[test]
    fn rewrites_host_to_upstream() {
        let mut original = HeaderMap::new();
        original.insert("host", "localhost:6749".parse().unwrap());

        let result = build_forwarded_headers(&original, client(), &config(true, false));

        assert_eq!(result.get("host").unwrap(), "pswww.slac.stanford.edu");
    }

    #[test]
    fn host_keeps_non_default_upstream_port() {
        let mut cfg = config(true, false);
        cfg.upstream = Upstream::from_url("http://backend:9090").unwrap();

        let result = build_forwarded_headers(&HeaderMap::new(), client(), &cfg);

        assert_eq!(result.get("host").unwrap(), "backend:9090");
    }

    #[test]
    fn preserves_host_without_change_origin() {
        let mut original = HeaderMap::new();
        original.insert("host", "localhost:6749".parse().unwrap());

        let result = build_forwarded_headers(&original, client(), &config(false, false));

        assert_eq!(result.get("host").unwrap(), "localhost:6749");
    }

    #[test]
    fn no_proxy_headers_by_default() {
        let mut original = HeaderMap::new();
        original.insert("host", "localhost:6749".parse().unwrap());
        original.insert("accept", "text/html".parse().unwrap());

        let result = build_forwarded_headers(&original, client(), &config(true, false));

        assert_eq!(result.len(), 2);
        assert!(result.get("x-forwarded-for").is_none());
    }

    #[test]
    fn xfwd_appends_to_forwarded_for_chain() {
        let mut original = HeaderMap::new();
        original.insert("host", "localhost:6749".parse().unwrap());
        original.insert("x-forwarded-for", "1.2.3.4".parse().unwrap());

        let result = build_forwarded_headers(&original, client(), &config(true, true));

        assert_eq!(result.get("x-forwarded-for").unwrap(), "1.2.3.4, 10.0.0.1");
        assert_eq!(result.get("x-forwarded-proto").unwrap(), "http");
        assert_eq!(result.get("x-forwarded-host").unwrap(), "localhost:6749");
    }
}
