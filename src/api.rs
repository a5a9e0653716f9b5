use axum::{
    debug_handler,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    chat::{Hub, Message, Presence},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/api/messages", get(messages))
        .route("/api/users", get(users))
}

#[debug_handler]
async fn index() -> &'static str {
    "Chat server running"
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    page: Option<usize>,
}

/// Whole history oldest-first, or one newest-first page with `?page=`.
#[debug_handler(state = crate::AppState)]
async fn messages(
    State(hub): State<Hub>,
    Query(PageQuery { page }): Query<PageQuery>,
) -> Json<Vec<Message>> {
    Json(match page {
        Some(page) => hub.page(page).await,
        None => hub.messages().await,
    })
}

#[debug_handler(state = crate::AppState)]
async fn users(State(hub): State<Hub>) -> Json<Vec<Presence>> {
    Json(hub.users().await)
}
