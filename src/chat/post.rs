use axum::{
    debug_handler,
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::{
    AppResult, MessageService,
    auth::SessionGate,
    service::RawUpload,
};

/// `POST /upload`: optional file part plus a text part, posted as one
/// message. Redirects back to the room on success.
#[debug_handler(state = crate::AppState)]
pub(crate) async fn upload(
    State(gate): State<SessionGate>,
    State(service): State<MessageService>,
    session: Session,
    mut multipart: Multipart,
) -> AppResult<Response> {
    // Gate before reading the body; nothing is stored for strangers.
    let user = gate.require_session(&session).await?;

    let mut text = String::new();
    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("text") => text = field.text().await?,
            Some("file") => {
                let Some(original_name) = field.file_name().map(str::to_owned) else {
                    continue;
                };
                if original_name.is_empty() {
                    continue;
                }
                let bytes = field.bytes().await?;
                file = Some(RawUpload {
                    original_name,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    service.post_message(&user, &text, file).await?;
    Ok(Redirect::to("/chat").into_response())
}
