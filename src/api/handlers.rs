use anyhow::Context;
use axum::{
    extract::{
        rejection::QueryRejection,
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use log::{debug, info};

use crate::app::AppState;
use crate::models::InvalidParameter;
use crate::pubsub::{Broadcaster, Subscription};
use crate::view::{self, ViewQuery};

use super::error::ApiError;

/// `GET /` - updates the shared view settings and returns the current view.
///
/// Both selectors are validated before the settings are touched, so a
/// rejected request leaves them as they were. Repeated or conflicting
/// selectors (`filter` together with `window`) are rejected the same way.
pub async fn query_view(
    State(state): State<AppState>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| InvalidParameter::Query(e.body_text()))?;
    let request = query.parse()?;
    let settings = state.view_state.apply(request).await;

    let view = view::compute(state.cache.scan_all(), settings);
    debug!("Serving {} tokens for {:?}", view.len(), settings);

    let body = serde_json::to_vec(&view).context("Failed to encode view")?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// `GET /ws` - registers a push observer for the lifetime of the socket.
pub async fn observe(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_observer(socket, state.broadcaster))
}

async fn handle_observer(socket: WebSocket, broadcaster: Broadcaster) {
    let Subscription { id, mut messages } = broadcaster.register().await;
    info!(
        "Observer {} connected ({} open)",
        id,
        broadcaster.observer_count().await
    );

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            payload = messages.recv() => {
                let Some(payload) = payload else { break };
                if sink.send(Message::Text(payload.to_string().into())).await.is_err() {
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                // Inbound frames carry no meaning; only a close ends the session
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {},
            },
        }
    }

    broadcaster.unregister(id).await;
    info!(
        "Observer {} disconnected ({} open)",
        id,
        broadcaster.observer_count().await
    );
}
