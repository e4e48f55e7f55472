//! Composition of the outbound request URI.

use axum::http::uri::InvalidUri;
use axum::http::Uri;

use crate::config::model::Upstream;

/// Map an inbound request URI onto the upstream.
///
/// Only the path and query of `inbound` are used, byte-for-byte; an
/// absolute-form request line (`GET http://other/x`) is treated the same
/// as `GET /x`. The upstream path prefix, if any, is prepended.
pub fn upstream_uri(upstream: &Upstream, inbound: &Uri) -> Result<Uri, InvalidUri> {
    let path_and_query = inbound.path_and_query().map_or("/", |pq| pq.as_str());

    // `OPTIONS *` has no path to prefix
    let prefix = if path_and_query.starts_with('/') {
        upstream.path_prefix.as_str()
    } else {
        ""
    };

    format!("{}{prefix}{path_and_query}", upstream.origin()).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(url: &str) -> Upstream {
        Upstream::from_url(url).unwrap()
    }

    #[test]
    fn keeps_path_and_query() {
        let inbound: Uri = "/path?x=1".parse().unwrap();
        let uri = upstream_uri(&upstream("https://pswww.slac.stanford.edu:443"), &inbound).unwrap();
        assert_eq!(uri.to_string(), "https://pswww.slac.stanford.edu/path?x=1");
    }

    #[test]
    fn keeps_non_default_port() {
        let inbound: Uri = "/".parse().unwrap();
        let uri = upstream_uri(&upstream("http://127.0.0.1:8080"), &inbound).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn prepends_path_prefix() {
        let inbound: Uri = "/runs/42?fmt=json".parse().unwrap();
        let uri = upstream_uri(&upstream("http://backend/ws/api"), &inbound).unwrap();
        assert_eq!(uri.to_string(), "http://backend/ws/api/runs/42?fmt=json");
    }

    #[test]
    fn absolute_form_uses_only_path() {
        let inbound: Uri = "http://elsewhere.example/a/b?c".parse().unwrap();
        let uri = upstream_uri(&upstream("http://backend:81"), &inbound).unwrap();
        assert_eq!(uri.to_string(), "http://backend:81/a/b?c");
    }

    #[test]
    fn percent_encoding_is_untouched() {
        let inbound: Uri = "/files/a%20b%2Fc?q=%E2%9C%93".parse().unwrap();
        let uri = upstream_uri(&upstream("http://backend"), &inbound).unwrap();
        assert_eq!(uri.path(), "/files/a%20b%2Fc");
        assert_eq!(uri.query(), Some("q=%E2%9C%93"));
    }
}
