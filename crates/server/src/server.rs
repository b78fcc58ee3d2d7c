use axum::{Router, routing::post};

use std::sync::Arc;

use crate::reports;
use analytics::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/organizations/{organization_id}/balance",
            post(reports::balance),
        )
        .route(
            "/organizations/{organization_id}/contacts",
            post(reports::contacts),
        )
        .route("/organizations/{organization_id}/roles", post(reports::roles))
        .route(
            "/organizations/{organization_id}/movements",
            post(reports::movements),
        )
        .route(
            "/organizations/{organization_id}/cashflow",
            post(reports::cashflow),
        )
        .with_state(state)
}

/// Router serving every report of `engine`.
pub fn app(engine: Engine) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
    })
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine)).await
}
