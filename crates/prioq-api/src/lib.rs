//! prioq-api — JSON-over-HTTP boundary for the queue engine.

pub mod handlers;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Build the `/api` router without binding anything.
pub fn router(state: ApiState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/topics", get(handlers::handle_topics))
        .route("/topics/{topic}", get(handlers::handle_topic_stats))
        .route(
            "/topics/{topic}/enqueue",
            post(handlers::handle_enqueue).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .route("/topics/{topic}/dequeue", post(handlers::handle_dequeue))
        .route("/topics/{topic}/ack", post(handlers::handle_ack))
        .route("/topics/{topic}/nack", post(handlers::handle_nack))
        .route("/daemon/shutdown", post(handlers::handle_shutdown))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Bind `addr:port` and serve until the state's shutdown signal fires.
pub async fn serve(
    state: ApiState,
    addr: &str,
    port: u16,
    max_body_bytes: usize,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("{}:{}", addr, port)).await?;
    tracing::info!(addr, port, "API listening");
    serve_on(listener, state, max_body_bytes).await
}

/// Serve on an already-bound listener. Tests bind port 0 and pass it here.
pub async fn serve_on(
    listener: TcpListener,
    state: ApiState,
    max_body_bytes: usize,
) -> anyhow::Result<()> {
    let mut shutdown = state.shutdown_tx.subscribe();
    let app = router(state, max_body_bytes);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}

/// Wait for a spawned `serve` task to finish its graceful shutdown, so
/// in-flight responses (a destructive dequeue included) reach the client.
/// Gives up after `grace`.
pub async fn drain(task: JoinHandle<anyhow::Result<()>>, grace: Duration) -> anyhow::Result<()> {
    match tokio::time::timeout(grace, task).await {
        Ok(joined) => joined?,
        Err(_) => anyhow::bail!("API server did not drain within {:?}", grace),
    }
}
