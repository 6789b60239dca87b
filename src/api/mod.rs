//! HTTP surface under `/api/v1`.
//!
//! Handlers validate input, call the shared [`FeedRepository`], and map
//! [`StorageError`](crate::storage::StorageError) kinds to status codes.

mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};
pub use handlers::FeedBody;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, put},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::logging::TARGET_HTTP;
use crate::storage::FeedRepository;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn FeedRepository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn FeedRepository>) -> Self {
        Self { repo }
    }
}

/// Build the router with every route, the JSON 404 fallback and request logging.
pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/healthcheck", get(handlers::healthcheck))
        .route("/feeds", get(handlers::get_feeds).post(handlers::add_feed))
        .route(
            "/feeds/{*url}",
            put(handlers::set_feed_state).delete(handlers::delete_feed),
        );

    Router::new()
        .nest("/api/v1", v1)
        .fallback(handlers::no_route)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Listening for incoming requests");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        target: TARGET_HTTP,
        %method,
        %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request served"
    );
    response
}
