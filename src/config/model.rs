//! Serde data structures for the pswproxy configuration file.
//!
//! Contains [`ProxyConfig`] (the root), [`ListenConfig`], [`Upstream`],
//! [`Timeouts`] and [`AdminConfig`]. Every field has a default so an empty
//! file is a valid config that proxies `0.0.0.0:6749` to
//! `https://pswww.slac.stanford.edu`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 6749;
pub const DEFAULT_UPSTREAM_HOST: &str = "pswww.slac.stanford.edu";

fn default_listen_host() -> String {
    DEFAULT_LISTEN_HOST.to_string()
}

const fn default_listen_port() -> u16 {
    DEFAULT_LISTEN_PORT
}

fn default_upstream_host() -> String {
    DEFAULT_UPSTREAM_HOST.to_string()
}

const fn default_connect_ms() -> u64 {
    10_000
}

const fn default_response_ms() -> u64 {
    30_000
}

const fn default_idle_ms() -> u64 {
    60_000
}

const fn default_pool_idle_secs() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(default)]
    pub listen: ListenConfig,

    #[serde(default)]
    pub upstream: Upstream,

    /// Rewrite the outbound `Host` header to the upstream authority.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub change_origin: bool,

    /// Add `X-Forwarded-For`, `X-Forwarded-Proto` and `X-Forwarded-Host`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub xfwd: bool,

    #[serde(default, skip_serializing_if = "Timeouts::is_default")]
    pub timeouts: Timeouts,

    /// Inbound request body cap in bytes. Unlimited when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body: Option<usize>,

    #[serde(default, skip_serializing_if = "AdminConfig::is_default")]
    pub admin: AdminConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            upstream: Upstream::default(),
            change_origin: true,
            xfwd: false,
            timeouts: Timeouts::default(),
            max_body: None,
            admin: AdminConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ListenConfig {
    #[serde(default = "default_listen_host")]
    pub host: String,

    #[serde(default = "default_listen_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    #[default]
    Https,
}

impl Protocol {
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single backend every request is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Upstream {
    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default = "default_upstream_host")]
    pub host: String,

    /// Falls back to the protocol's well-known port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Prepended to every forwarded path. Empty or starting with `/`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path_prefix: String,
}

impl Default for Upstream {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            host: default_upstream_host(),
            port: None,
            path_prefix: String::new(),
        }
    }
}

impl Upstream {
    /// Build an upstream from a URL such as `https://host:8443/prefix`.
    ///
    /// Query strings and fragments are rejected since they cannot be
    /// combined with the forwarded request's own query.
    pub fn from_url(raw: &str) -> Result<Self, String> {
        let parsed = url::Url::parse(raw).map_err(|_| format!("'{raw}' is not a valid URL"))?;

        let protocol = match parsed.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            other => {
                return Err(format!(
                    "unsupported scheme '{other}' (expected http or https)"
                ))
            }
        };

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| format!("'{raw}' has no host"))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(format!("'{raw}' must not carry a query or fragment"));
        }

        Ok(Self {
            protocol,
            host,
            port: parsed.port(),
            path_prefix: parsed.path().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// `host[:port]`, with the port only when it differs from the
    /// protocol default. This is what a client would put in `Host`.
    #[must_use]
    pub fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port() == self.protocol.default_port() {
            host
        } else {
            format!("{host}:{}", self.port())
        }
    }

    /// Scheme and authority, without the path prefix.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}", self.protocol, self.authority())
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.origin(), self.path_prefix)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Timeouts {
    #[serde(default = "default_connect_ms")]
    pub connect_ms: u64,

    /// Time allowed for the upstream to send response headers.
    #[serde(default = "default_response_ms")]
    pub response_ms: u64,

    /// Longest allowed gap between upstream response body frames.
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,

    #[serde(default = "default_pool_idle_secs")]
    pub pool_idle_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_ms(),
            response_ms: default_response_ms(),
            idle_ms: default_idle_ms(),
            pool_idle_secs: default_pool_idle_secs(),
        }
    }
}

impl Timeouts {
    fn is_default(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub const fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms)
    }

    #[must_use]
    pub const fn response(&self) -> Duration {
        Duration::from_millis(self.response_ms)
    }

    #[must_use]
    pub const fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    #[must_use]
    pub const fn pool_idle(&self) -> Duration {
        Duration::from_secs(self.pool_idle_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Port of the admin listener serving `/health`. Disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl AdminConfig {
    fn is_default(&self) -> bool {
        self.port.is_none()
    }
}
