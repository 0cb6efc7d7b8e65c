mod page;
mod post;
mod ws;

use axum::{Router, routing::get};

use crate::AppState;

pub(crate) use post::upload;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(page::chat_page))
        .route("/history", get(page::history))
        .route("/ws", get(ws::chat_ws))
}
