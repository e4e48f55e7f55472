//! `pswproxy run`: start the proxy server.
//!
//! Resolves the configuration (flags over file over defaults), binds the
//! proxy port and the optional admin port, and serves until SIGINT or
//! SIGTERM. Any bind failure aborts startup with a non-zero exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::RunArgs;
use crate::config::{self, model::ProxyConfig};
use crate::error::ProxyError;
use crate::health;
use crate::logging;
use crate::server::{self, AppState, ForwardingListener};

pub async fn execute(args: RunArgs) -> Result<(), ProxyError> {
    let log_format = logging::resolve_format(args.pretty, args.json);
    logging::init(
        logging::effective_level(&args.log_level, args.verbose),
        log_format,
    );

    let file_config = resolve_file_config(args.config.as_deref()).await?;
    let config = config::resolve(file_config, &args.overrides())?;

    let state = Arc::new(AppState::new(config));
    let listener = ForwardingListener::bind_with_state(Arc::clone(&state)).await?;

    // Dropping or signalling shutdown_tx stops the admin listener too
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    let admin_handle = match state.config.admin.port {
        Some(port) => {
            let addr = server::socket_addr(&state.config.listen.host, port)?;
            let admin_listener = server::bind(addr).await?;
            let admin_state = Arc::clone(&state);
            Some(tokio::spawn(async move {
                health::serve_admin(admin_listener, admin_state, async move {
                    let _ = shutdown_rx.changed().await;
                })
                .await
            }))
        }
        None => None,
    };

    let graceful_shutdown = async move {
        server::shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    };

    listener.serve(graceful_shutdown).await?;

    if let Some(handle) = admin_handle {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "admin listener failed"),
            Err(e) => tracing::error!(error = %e, "admin listener task failed"),
        }
    }

    tracing::info!("pswproxy stopped");
    Ok(())
}

async fn resolve_file_config(explicit: Option<&Path>) -> Result<Option<ProxyConfig>, ProxyError> {
    if let Some(path) = explicit {
        return config::load_file(path).await.map(Some);
    }

    // Auto-detect in current directory
    let candidates = [
        "pswproxy.yaml",
        "pswproxy.yml",
        "pswproxy.json",
        "pswproxy.toml",
    ];

    for name in &candidates {
        let path = PathBuf::from(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return config::load_file(&path).await.map(Some);
        }
    }

    Ok(None)
}
