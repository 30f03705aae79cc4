//! Service lifecycle: open the store, bind, serve until shutdown

use anyhow::Result;
use burn_core::config::BurnConfig;
use tracing::info;

use crate::api::{self, AppState};

pub async fn run(config: BurnConfig) -> Result<()> {
    let store = burn_store::open_store(&config.store)
        .await
        .map_err(|e| anyhow::anyhow!("opening {:?} store: {e}", config.store.backend))?;

    info!(
        backend = store.backend(),
        default_ttl_secs = config.store.default_ttl_secs,
        max_ttl_secs = config.store.max_ttl_secs,
        "secret store ready"
    );

    let state = AppState::new(store, &config);
    let app = api::router(state, &config);

    let addr = config.server.listen.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("bind {addr}: {e}"))?;

    info!(addr = %addr, metrics = config.server.metrics, "HTTP: listening");

    notify_ready();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server: {e}"))?;

    info!("burnd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("installing ctrl-c handler failed: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

fn notify_ready() {
    // Send sd_notify(READY=1) to systemd if running as a service
    // Uses $NOTIFY_SOCKET env var; no-op if not set
    #[cfg(unix)]
    if let Ok(socket) = std::env::var("NOTIFY_SOCKET") {
        use std::os::unix::net::UnixDatagram;
        if let Ok(sock) = UnixDatagram::unbound() {
            let _ = sock.send_to(b"READY=1\n", &socket);
            tracing::debug!(notify_socket = %socket, "sent systemd READY=1");
        }
    }
}
