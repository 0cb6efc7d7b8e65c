use axum::{
    Form, debug_handler,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{AppError, AppResult};

use super::SessionGate;

#[derive(Deserialize)]
pub(crate) struct RegisterForm {
    name: String,
    password: String,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(gate): State<SessionGate>,
    session: Session,
    Form(RegisterForm { name, password }): Form<RegisterForm>,
) -> AppResult<Response> {
    match gate.register(&name, &password).await {
        Ok(user) => {
            gate.bind_session(&session, &user).await?;
            tracing::info!(user = %user.name, "registered");
            Ok(Redirect::to("/chat").into_response())
        }
        // registration policy failures carry their specific message
        Err(err @ (AppError::DuplicateName | AppError::CapacityExceeded)) => {
            Ok(err.into_response())
        }
        Err(err) => Err(err),
    }
}
