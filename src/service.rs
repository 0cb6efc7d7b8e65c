use time::OffsetDateTime;

use crate::{
    AppError, AppResult, MediaStore, MessageStore, PRIVATE_ROOM, RoomRegistry,
    auth::AuthedUser,
    registry::RoomEvent,
    store::Message,
};

/// A file as it arrived on the wire, before admission.
pub struct RawUpload {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// The one place chat state changes. Admission order is fixed: media first,
/// then the durable append, then fan-out. Persistence is the commit point —
/// once the row exists the broadcast happens, and if anything earlier fails
/// nothing was persisted and nothing goes out.
#[derive(Clone)]
pub struct MessageService {
    store: MessageStore,
    media: MediaStore,
    registry: RoomRegistry,
}

impl MessageService {
    pub fn new(store: MessageStore, media: MediaStore, registry: RoomRegistry) -> Self {
        Self { store, media, registry }
    }

    pub async fn post_message(
        &self,
        user: &AuthedUser,
        text: &str,
        upload: Option<RawUpload>,
    ) -> AppResult<Message> {
        if text.is_empty() && upload.is_none() {
            return Err(AppError::EmptyMessage);
        }

        // The pipeline runs detached from the caller. A poster hanging up
        // drops the handler future, but once the append commits the
        // broadcast still has to go out, so dropping this await must not
        // cancel the work in flight.
        let service = self.clone();
        let user = user.clone();
        let text = text.to_owned();
        let pipeline =
            tokio::spawn(async move { service.admit_persist_broadcast(&user, &text, upload).await });

        pipeline
            .await
            .map_err(|err| AppError::Other(anyhow::anyhow!("message pipeline died: {err}")))?
    }

    async fn admit_persist_broadcast(
        &self,
        user: &AuthedUser,
        text: &str,
        upload: Option<RawUpload>,
    ) -> AppResult<Message> {
        let media_ref = match upload {
            Some(upload) => Some(self.media.admit(&upload.original_name, &upload.bytes).await?),
            None => None,
        };

        let message = self
            .store
            .append(
                user.id,
                text,
                media_ref.as_ref().map(|r| r.0.as_str()),
                OffsetDateTime::now_utc(),
            )
            .await?;

        // Broadcast from the persisted row's own fields, so what listeners
        // see live is exactly what replay returns later.
        self.registry.broadcast(
            PRIVATE_ROOM,
            &RoomEvent {
                sender: user.name.clone(),
                text: message.text.clone(),
                filename: message.filename.clone(),
                timestamp: message.timestamp.clone(),
            },
        );

        tracing::debug!(id = message.id, sender = %user.name, "message posted");
        Ok(message)
    }

    /// Full replay, in id order.
    pub async fn history(&self) -> AppResult<Vec<Message>> {
        self.store.list_all().await
    }
}
