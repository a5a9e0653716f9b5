use axum::{
    debug_handler,
    extract::{State, WebSocketUpgrade, ws::{Message, WebSocket}},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::{
    chat::{ClientEvent, Hub},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(chat_ws))
}

#[debug_handler(state = crate::AppState)]
pub async fn chat_ws(State(hub): State<Hub>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(async move |stream| serve_socket(stream, hub).await)
}

async fn serve_socket(stream: WebSocket, hub: Hub) {
    let (session, mut inbox) = hub.connect().await;
    let id = session.id();
    let (mut sender, mut receiver) = stream.split();
    debug!(%id, "socket connected");

    let mut forward_task = tokio::spawn(async move {
        while let Some(event) = inbox.recv().await {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(%id, "failed to encode event: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => match ClientEvent::from_frame(text.as_str()) {
                    Ok(event) => session.handle(event).await,
                    Err(e) => debug!(%id, "dropping frame: {e}"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%id, "socket error: {e}");
                    break;
                }
            },
            _ = &mut forward_task => {
                debug!(%id, "socket send failed");
                break;
            }
        }
    }

    forward_task.abort();
    session.close().await;
    debug!(%id, "socket closed");
}
