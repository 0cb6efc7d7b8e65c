pub mod auth;
pub mod chat;
pub mod error;
pub mod media;
pub mod registry;
pub mod res;
pub mod service;
pub mod session;
pub mod store;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use sqlx::SqlitePool;
use tower_http::services::ServeDir;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};

pub use error::{AppError, AppResult};
pub use media::MediaStore;
pub use registry::RoomRegistry;
pub use service::MessageService;
pub use store::MessageStore;

/// The one room everybody lives in.
pub const PRIVATE_ROOM: &str = "private_room";

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub gate: auth::SessionGate,
    pub store: MessageStore,
    pub registry: RoomRegistry,
    pub media: MediaStore,
    pub service: MessageService,
}

impl AppState {
    /// Wire every component up once; everything downstream gets these by
    /// explicit clone, never by ambient lookup.
    pub fn new(db_pool: SqlitePool, media: MediaStore) -> Self {
        let store = MessageStore::new(db_pool.clone());
        let gate = auth::SessionGate::new(db_pool.clone());
        let registry = RoomRegistry::new();
        let service = MessageService::new(store.clone(), media.clone(), registry.clone());

        Self {
            db_pool,
            gate,
            store,
            registry,
            media,
            service,
        }
    }

    /// Create the schema each component owns, users before the messages
    /// table that references them.
    pub async fn init_schema(&self) -> AppResult<()> {
        self.gate.init().await?;
        self.store.init().await?;
        Ok(())
    }
}

pub fn app(state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(60)));

    Router::new()
        .route("/", get(auth::login_page))
        .route("/upload", post(chat::upload))
        .merge(auth::router())
        .nest("/chat", chat::router())
        .nest_service("/uploads", ServeDir::new(state.media.dir()))
        .with_state(state)
        .layer(session_layer)
}
