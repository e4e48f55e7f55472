//! Listener lifecycle, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding config, HTTP
//! client, stats, and uptime), [`ForwardingListener`] with explicit
//! bind / serve / stop semantics, [`build_http_client`] for the
//! connection-pooled upstream client, and [`shutdown_signal`] for
//! SIGTERM / Ctrl+C handling.

use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::Router;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::model::{ProxyConfig, Timeouts};
use crate::error::ProxyError;
use crate::proxy;

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;
pub type HttpClient = Client<HttpsConnector, Body>;

pub struct AppState {
    pub config: ProxyConfig,
    pub http_client: HttpClient,
    pub start_time: Instant,
    pub stats: Stats,
}

impl AppState {
    #[must_use]
    pub fn new(config: ProxyConfig) -> Self {
        let http_client = build_http_client(&config.timeouts);
        Self {
            config,
            http_client,
            start_time: Instant::now(),
            stats: Stats::new(),
        }
    }
}

/// Pooled HTTP/1.1 client. Certificates are verified against the
/// bundled webpki roots; plain `http` upstreams are allowed.
#[must_use]
pub fn build_http_client(timeouts: &Timeouts) -> HttpClient {
    // When multiple rustls crypto providers are compiled in, rustls cannot
    // auto-detect which one to use. Explicitly install `ring`.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(timeouts.connect()));
    http.set_nodelay(true);

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(timeouts.pool_idle())
        .build(https)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.max_body;
    let router = Router::new().fallback(proxy::forward_handler);

    let router = match max_body {
        Some(limit) => router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(limit)),
        ),
        None => router.layer(TraceLayer::new_for_http()),
    };

    router.with_state(state)
}

/// Resolve `host:port` into a socket address. Accepts bare IPv6 hosts.
pub fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ProxyError> {
    let ip: IpAddr = host.parse()?;
    Ok(SocketAddr::new(ip, port))
}

/// Bind a TCP listener, tagging failures with the address.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ProxyError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ProxyError::Bind { addr, source })
}

/// The proxy port: one bound socket serving every inbound connection
/// against the configured upstream.
///
/// Lifecycle: [`bind`](Self::bind) claims the port (failing fast when it
/// is taken), [`serve`](Self::serve) runs until the shutdown future
/// resolves and then drains in-flight requests. [`start`](Self::start)
/// combines both on a background task and returns a [`ListenerHandle`].
pub struct ForwardingListener {
    listener: TcpListener,
    state: Arc<AppState>,
    local_addr: SocketAddr,
}

impl ForwardingListener {
    pub async fn bind(config: ProxyConfig) -> Result<Self, ProxyError> {
        Self::bind_with_state(Arc::new(AppState::new(config))).await
    }

    pub async fn bind_with_state(state: Arc<AppState>) -> Result<Self, ProxyError> {
        let addr = socket_addr(&state.config.listen.host, state.config.listen.port)?;
        let listener = bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            state,
            local_addr,
        })
    }

    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub async fn serve<F>(self, shutdown: F) -> Result<(), ProxyError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(
            addr = %self.local_addr,
            upstream = %self.state.config.upstream,
            change_origin = self.state.config.change_origin,
            "forwarding listener started"
        );

        let router = build_router(self.state);
        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        tracing::info!(addr = %self.local_addr, "forwarding listener stopped");
        Ok(())
    }

    /// Bind and serve on a background task.
    pub async fn start(config: ProxyConfig) -> Result<ListenerHandle, ProxyError> {
        let listener = Self::bind(config).await?;
        let addr = listener.local_addr();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(listener.serve(async move {
            let _ = shutdown_rx.await;
        }));

        Ok(ListenerHandle {
            addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

pub struct ListenerHandle {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), ProxyError>>,
}

impl ListenerHandle {
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn stop(self) -> Result<(), ProxyError> {
        let _ = self.shutdown.send(());
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ProxyError::Io(std::io::Error::other(e))),
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_addr_accepts_bare_ipv6() {
        let addr = socket_addr("::1", 6749).unwrap();
        assert_eq!(addr.to_string(), "[::1]:6749");
    }

    #[test]
    fn socket_addr_rejects_hostnames() {
        assert!(matches!(
            socket_addr("localhost", 6749),
            Err(ProxyError::AddressParse(_))
        ));
    }
}
