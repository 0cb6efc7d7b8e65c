use axum::{
    Json, debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tower_sessions::Session;

use crate::{AppResult, MessageService, auth::SessionGate, include_res, store::Message};

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_page(
    State(gate): State<SessionGate>,
    session: Session,
) -> AppResult<Response> {
    let Ok(user) = gate.require_session(&session).await else {
        return Ok(Redirect::to("/").into_response());
    };

    let body = include_res!(str, "/pages/chat.html").replace("{name}", &user.name);
    Ok(Html(body).into_response())
}

#[derive(Serialize)]
pub(crate) struct HistoryResponse {
    name: String,
    messages: Vec<Message>,
}

/// Replay: the full ordered log plus the caller's display name. Pulled once
/// on room entry, independent of the live channel.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn history(
    State(gate): State<SessionGate>,
    State(service): State<MessageService>,
    session: Session,
) -> AppResult<Json<HistoryResponse>> {
    let user = gate.require_session(&session).await?;
    let messages = service.history().await?;

    Ok(Json(HistoryResponse {
        name: user.name,
        messages,
    }))
}
