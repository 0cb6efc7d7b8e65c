mod gate;
mod login;
mod logout;
mod register;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub use gate::{AuthedUser, SessionGate};
pub(crate) use login::login_page;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page).post(login::login))
        .route("/register", post(register::register))
        .route("/logout", get(logout::logout))
}
