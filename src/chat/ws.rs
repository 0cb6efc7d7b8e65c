use axum::{
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message as WsMessage, WebSocket},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    AppResult, PRIVATE_ROOM, RoomRegistry,
    auth::SessionGate,
    registry::RoomEvent,
};

#[derive(Serialize)]
struct WireEvent<'a> {
    event: &'a str,
    data: &'a RoomEvent,
}

/// The live channel. The client sends a `join` frame to enter the room;
/// after that the server pushes `new_message` events until the socket dies.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(gate): State<SessionGate>,
    State(registry): State<RoomRegistry>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    gate.require_session(&session).await?;

    Ok(ws.on_upgrade(move |stream| handle_socket(stream, registry)))
}

async fn handle_socket(stream: WebSocket, registry: RoomRegistry) {
    let conn = Uuid::now_v7();
    let (mut sink, mut source) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<RoomEvent>();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match serde_json::to_string(&WireEvent {
                event: "new_message",
                data: &event,
            }) {
                Ok(frame) => frame,
                Err(err) => {
                    tracing::warn!(%err, "failed to encode event");
                    continue;
                }
            };
            if sink.send(WsMessage::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = source.next() => match frame {
                Some(Ok(WsMessage::Text(frame))) if is_join(frame.as_str()) => {
                    registry.join(PRIVATE_ROOM, conn, tx.clone());
                }
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut send_task => break,
        }
    }

    // every exit path lands here, normal close or not
    registry.leave(conn);
    send_task.abort();
}

fn is_join(frame: &str) -> bool {
    if frame.trim() == "join" {
        return true;
    }
    serde_json::from_str::<serde_json::Value>(frame)
        .ok()
        .and_then(|value| {
            value
                .get("event")
                .and_then(|event| event.as_str())
                .map(|event| event == "join")
        })
        .unwrap_or(false)
}
