use axum::{
    Form, debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::{AppError, AppResult, include_res, session::USER_ID};

use super::SessionGate;

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    name: String,
    password: String,
}

#[debug_handler]
pub(crate) async fn login_page(session: Session) -> AppResult<Response> {
    if session.get::<i64>(USER_ID).await?.is_some() {
        return Ok(Redirect::to("/chat").into_response());
    }

    Ok(Html(include_res!(str, "/pages/login.html")).into_response())
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn login(
    State(gate): State<SessionGate>,
    session: Session,
    Form(LoginForm { name, password }): Form<LoginForm>,
) -> AppResult<Response> {
    match gate.authenticate(&name, &password).await {
        Ok(user) => {
            gate.bind_session(&session, &user).await?;
            tracing::info!(user = %user.name, "signed in");
            Ok(Redirect::to("/chat").into_response())
        }
        Err(AppError::BadCredentials) => Ok(AppError::BadCredentials.into_response()),
        Err(err) => Err(err),
    }
}
