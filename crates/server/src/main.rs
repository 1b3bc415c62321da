//! Deskglow - 3CX presence to WLED bridge
//!
//! Main entry point: loads configuration, brings up the scraper session and
//! poll scheduler, and serves the dashboard until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use deskglow_domain::constants::SHUTDOWN_DEADLINE_SECS;
use deskglow_server::context::AppContext;
use deskglow_server::build_app;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    let config = deskglow_infra::config_loader::load()?;
    let port = config.server.port;
    let ctx = Arc::new(AppContext::new(config)?);

    // Bring up the scraper. Neither an unfinished login nor a dead driver is
    // fatal: the scheduler keeps retrying and the dashboard shows the state.
    match ctx.session.initialize().await {
        Ok(true) => info!("Scraper session monitoring"),
        Ok(false) => warn!("Scraper awaiting interactive login; collection deferred"),
        Err(e) => warn!(error = %e, "Scraper initialization failed; recovery will retry"),
    }
    ctx.reconciler.set_auth_state(ctx.session.auth_state().await).await;

    ctx.scheduler.lock().await.start().await?;

    let app = build_app(Arc::clone(&ctx));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Dashboard server listening");

    // The listener closes last: the dashboard keeps answering while the
    // scheduler, browser, and LED are torn down.
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    shutdown(&ctx).await;

    let _ = stop_tx.send(());
    server.await??;

    info!("Deskglow stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}

/// Ordered teardown: stop producing cycles, close the browser, then leave
/// the LED dark. Bounded so a wedged browser cannot hang the exit.
async fn shutdown(ctx: &AppContext) {
    let deadline = Duration::from_secs(SHUTDOWN_DEADLINE_SECS);
    let sequence = async {
        if let Err(e) = ctx.scheduler.lock().await.stop().await {
            warn!(error = %e, "Poll scheduler did not stop cleanly");
        }
        if let Err(e) = ctx.session.close().await {
            warn!(error = %e, "Browser session did not close cleanly");
        }
        if !ctx.reconciler.shutdown_led().await {
            warn!("LED device did not acknowledge power-off");
        }
    };

    if tokio::time::timeout(deadline, sequence).await.is_err() {
        warn!(deadline_secs = SHUTDOWN_DEADLINE_SECS, "Shutdown deadline exceeded");
    }
}
