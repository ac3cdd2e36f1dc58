use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub mod handlers;


use crate::AppContext;

/// Binds `addr` and serves until Ctrl-C. Jobs already running finish before
/// the server returns.
pub async fn start_server(ctx: Arc<AppContext>, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    serve(ctx, listener, shutdown_signal()).await
}

pub async fn serve<F>(ctx: Arc<AppContext>, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = handlers::router(ctx);

    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining in-flight jobs"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C, serving until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
