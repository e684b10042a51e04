//! Live socket handler
//!
//! Subscribes the connection to the realtime registry and forwards
//! frames as JSON text messages until either side hangs up. The registry
//! handle deregisters the connection when the task ends.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::domain::types::AccountId;

use super::LiveQuery;
use crate::infra::http::api::state::ApiState;

pub async fn live_socket(
    State(state): State<ApiState>,
    Query(query): Query<LiveQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| relay_frames(state, query.user_id, socket))
}

async fn relay_frames(state: ApiState, account: AccountId, socket: WebSocket) {
    let (handle, mut frames) = state.live.subscribe(account);
    debug!(account, "live subscriber connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                let Ok(text) = serde_json::to_string(&frame) else { continue };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    // Subscribers only listen; anything but a close is ignored.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!(account = handle.account(), "live subscriber disconnected");
}
