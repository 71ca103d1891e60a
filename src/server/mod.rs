pub mod handlers;
mod types;

pub use types::{ErrorResponse, HistoryQuery, PromptRequest, PromptResponse};

use crate::{Result, config::ServerConfig};
use axum::{
    Router,
    routing::{get, post},
};
use handlers::AppState;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(handlers::submit_prompt))
        .route("/status", get(handlers::status))
        .route("/history", get(handlers::history))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = router(state);

    let addr = SocketAddr::new(config.host.parse()?, config.port);

    info!("Listening for prompts on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
