//! HTTP server facade for YelpCamp: Axum router assembly, error rendering,
//! views, flash messages, session cookies and method override.

use anyhow::Context;
use axum::{extract::Request, middleware::map_request, Router, ServiceExt};
use tower::Layer;

pub mod error;
pub mod flash;
pub mod method_override;
pub mod router;
pub mod session;
pub mod view;

pub use error::AppError;
pub use flash::{Flash, FlashMessages};
pub use router::RouterBuilder;
pub use view::View;

/// Serve `app` until ctrl-c, with `_method` overrides applied before routing
pub async fn start_server(
    app: Router,
    settings: &yelpcamp_kernel::settings::Settings,
) -> anyhow::Result<()> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!("starting HTTP server on {}", address);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    let app = map_request(method_override::rewrite_method).layer(app);

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}
