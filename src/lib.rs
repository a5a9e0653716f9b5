pub mod api;
pub mod chat;
pub mod config;
pub mod ws;

use std::io;

use axum::{extract::FromRef, http::Method, Router};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{chat::Hub, config::Config};

#[derive(Clone, Default, FromRef)]
pub struct AppState {
    pub hub: Hub,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

pub fn router(state: AppState, config: &Config) -> Router {
    let origin = match &config.client_origin {
        Some(origin) => AllowOrigin::exact(origin.clone()),
        None => AllowOrigin::any(),
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .merge(api::router())
        .merge(ws::router())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: &Config, state: AppState) -> Result<(), ServerError> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
    info!(%addr, "chat server listening");

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .map_err(ServerError::Serve)
}
