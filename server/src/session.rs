//! Connection sessions and their outbound event channels.
//!
//! One [`Session`] exists per live connection. It binds the transport to a
//! display name and (once joined) a room, and carries the sender half of the
//! channel the coordinator delivers [`ServerEvent`]s through. Delivery is
//! fire-and-forget: a send to a closing connection is dropped, never awaited.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;
use watchroom_protocol::{RoomId, ServerEvent, SessionId};

/// State for one live connection.
pub struct Session {
    pub id: SessionId,
    pub username: String,
    /// Room this session has joined, if any.
    pub room: Option<RoomId>,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// In-memory table of all live sessions.
pub struct SessionManager {
    sessions: DashMap<SessionId, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Create a session for a freshly opened connection. The session starts
    /// with a generated guest name and no room.
    pub fn register(&self, sender: mpsc::UnboundedSender<ServerEvent>) -> SessionId {
        let id = SessionId(Uuid::new_v4().to_string());
        let username = format!("Guest_{}", &id.0[..4]);
        self.sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                username,
                room: None,
                sender,
            },
        );
        tracing::debug!(session_id = %id, "session registered");
        id
    }

    /// Drop a session on disconnect. Returns the username and joined room it
    /// held, which the caller uses to run the leave path.
    pub fn unregister(&self, id: &SessionId) -> Option<(String, Option<RoomId>)> {
        self.sessions
            .remove(id)
            .map(|(_, session)| (session.username, session.room))
    }

    /// Deliver an event to one session. Fire-and-forget: if the connection
    /// is gone the event is dropped.
    pub fn send(&self, id: &SessionId, event: ServerEvent) {
        if let Some(session) = self.sessions.get(id) {
            if session.sender.send(event).is_err() {
                tracing::debug!(session_id = %id, "dropped event for closing session");
            }
        }
    }

    pub fn set_username(&self, id: &SessionId, username: String) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.username = username;
        }
    }

    pub fn set_room(&self, id: &SessionId, room: Option<RoomId>) {
        if let Some(mut session) = self.sessions.get_mut(id) {
            session.room = room;
        }
    }

    pub fn username(&self, id: &SessionId) -> Option<String> {
        self.sessions.get(id).map(|s| s.username.clone())
    }

    pub fn room_of(&self, id: &SessionId) -> Option<RoomId> {
        self.sessions.get(id).and_then(|s| s.room.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
