use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Handle for one live connection.
pub type ConnId = Uuid;

/// The only event the server pushes to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomEvent {
    pub sender: String,
    pub text: String,
    pub filename: Option<String>,
    pub timestamp: String,
}

type Members = HashMap<ConnId, mpsc::UnboundedSender<RoomEvent>>;

/// Tracks which live connections sit in which room and fans events out to
/// them. Membership is in-memory only; clients rejoin after a restart.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, Members>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Joining a room you are already in is a
    /// no-op that keeps the original channel.
    pub fn join(&self, room: &str, conn: ConnId, tx: mpsc::UnboundedSender<RoomEvent>) {
        let mut rooms = self.rooms.lock().unwrap();
        rooms
            .entry(room.to_owned())
            .or_default()
            .entry(conn)
            .or_insert(tx);
    }

    /// Drop a connection from every room. Runs on every disconnect path so
    /// broadcasts never target dead channels for long.
    pub fn leave(&self, conn: ConnId) {
        let mut rooms = self.rooms.lock().unwrap();
        for members in rooms.values_mut() {
            members.remove(&conn);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    /// Deliver an event to everyone currently in the room. Best-effort per
    /// connection: one closed channel never stops delivery to the rest, and
    /// the caller's message is already durable by the time we get here.
    pub fn broadcast(&self, room: &str, event: &RoomEvent) {
        let members: Vec<(ConnId, mpsc::UnboundedSender<RoomEvent>)> = {
            let rooms = self.rooms.lock().unwrap();
            match rooms.get(room) {
                Some(members) => members
                    .iter()
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect(),
                None => return,
            }
        };

        for (conn, tx) in members {
            if tx.send(event.clone()).is_err() {
                tracing::debug!(%conn, "dropping event for closed connection");
                self.leave(conn);
            }
        }
    }

    pub fn member_count(&self, room: &str) -> usize {
        self.rooms
            .lock()
            .unwrap()
            .get(room)
            .map(Members::len)
            .unwrap_or(0)
    }
}
