//! Wire contract shared between the watchroom server and its clients.
//!
//! Every realtime frame is a JSON text message shaped
//! `{"event": <name>, "data": <payload>}`, with camelCase event and field
//! names. [`ClientEvent`] covers client→server frames, [`ServerEvent`] the
//! server→client direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque unique identifier for a room. Generated at creation, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-assigned identifier for a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// Room entries
// ============================================================================

/// A chat entry in a room's append-only message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Monotonic within the room.
    pub id: u64,
    pub username: String,
    pub user_id: SessionId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// An emoji reaction pinned to a point in the movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    /// Monotonic within the room.
    pub id: u64,
    pub emoji: String,
    /// Movie timestamp in seconds.
    pub timestamp: f64,
    pub username: String,
    pub user_id: SessionId,
    pub created_at: DateTime<Utc>,
}

/// One option of an ephemeral poll. Votes are relayed, never tallied here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub votes: Vec<SessionId>,
}

/// An ephemeral poll. Broadcast once, not stored in room state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: u64,
    pub question: String,
    pub options: Vec<PollOption>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// A room member as seen in the join snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub id: SessionId,
    pub username: String,
    pub is_host: bool,
}

/// Full room state delivered to a session when it joins.
///
/// A late joiner receives everything in one reply; there is no separate
/// catch-up protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub room_name: String,
    pub movie_link: String,
    pub genre_tag: String,
    pub messages: Vec<ChatMessage>,
    pub reactions: Vec<Reaction>,
    pub sync_time: f64,
    pub is_playing: bool,
    pub user_count: usize,
    /// Whether the receiving session is the host.
    pub is_host: bool,
    pub host_id: Option<SessionId>,
    pub users: Vec<MemberInfo>,
}

// ============================================================================
// Client → server events
// ============================================================================

/// Frames a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        username: Option<String>,
        password: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    SendMessage { room_id: RoomId, text: String },
    #[serde(rename_all = "camelCase")]
    SendReaction {
        room_id: RoomId,
        emoji: String,
        /// Movie timestamp in seconds.
        timestamp: f64,
    },
    #[serde(rename_all = "camelCase")]
    SyncMovieState {
        room_id: RoomId,
        current_time: f64,
        is_playing: bool,
    },
    #[serde(rename_all = "camelCase")]
    RequestSync { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    CreatePoll {
        room_id: RoomId,
        question: String,
        options: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    VotePoll {
        room_id: RoomId,
        poll_id: u64,
        option_index: usize,
    },
}

// ============================================================================
// Server → client events
// ============================================================================

/// Frames the server may deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Join reply, sent to the joining session only.
    RoomState(RoomSnapshot),
    /// Join-time or membership failure, sent to the requester only.
    RoomError { message: String },
    NewMessage(ChatMessage),
    NewReaction(Reaction),
    /// Playback state propagation. `synced_by` is absent on private
    /// `requestSync` replies.
    #[serde(rename_all = "camelCase")]
    MovieStateUpdated {
        current_time: f64,
        is_playing: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        synced_by: Option<String>,
        /// Unix milliseconds at send time.
        server_time: i64,
    },
    /// Playback authority failure, sent to the requester only.
    SyncError { message: String },
    NewPoll(Poll),
    #[serde(rename_all = "camelCase")]
    PollVoted {
        poll_id: u64,
        option_index: usize,
        user_id: SessionId,
        username: String,
    },
    #[serde(rename_all = "camelCase")]
    UserJoined {
        username: String,
        user_id: SessionId,
        user_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        username: String,
        user_id: SessionId,
        user_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    HostChanged {
        new_host_id: SessionId,
        new_host_username: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn join_room_frame_parses() {
        let frame =
            r#"{"event":"joinRoom","data":{"roomId":"abc","username":"ana","password":"pw"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        match event {
            ClientEvent::JoinRoom {
                room_id,
                username,
                password,
            } => {
                assert_eq!(room_id, RoomId("abc".into()));
                assert_eq!(username.as_deref(), Some("ana"));
                assert_eq!(password.as_deref(), Some("pw"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn join_room_username_and_password_are_optional() {
        let frame = r#"{"event":"joinRoom","data":{"roomId":"abc"}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        match event {
            ClientEvent::JoinRoom {
                username, password, ..
            } => {
                assert!(username.is_none());
                assert!(password.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sync_frame_uses_camel_case_fields() {
        let frame = r#"{"event":"syncMovieState","data":{"roomId":"abc","currentTime":10.5,"isPlaying":true}}"#;
        let event: ClientEvent = serde_json::from_str(frame).unwrap();
        match event {
            ClientEvent::SyncMovieState {
                current_time,
                is_playing,
                ..
            } => {
                assert_eq!(current_time, 10.5);
                assert!(is_playing);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn movie_state_updated_serializes_to_contract_shape() {
        let event = ServerEvent::MovieStateUpdated {
            current_time: 42.0,
            is_playing: false,
            synced_by: Some("ana".into()),
            server_time: 1_700_000_000_000,
        };
        let value: Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "movieStateUpdated");
        assert_eq!(value["data"]["currentTime"], 42.0);
        assert_eq!(value["data"]["isPlaying"], false);
        assert_eq!(value["data"]["syncedBy"], "ana");
        assert_eq!(value["data"]["serverTime"], json!(1_700_000_000_000i64));
    }

    #[test]
    fn private_sync_reply_omits_synced_by() {
        let event = ServerEvent::MovieStateUpdated {
            current_time: 0.0,
            is_playing: true,
            synced_by: None,
            server_time: 0,
        };
        let value: Value = serde_json::to_value(&event).unwrap();
        assert!(value["data"].get("syncedBy").is_none());
    }

    #[test]
    fn user_joined_serializes_with_user_count() {
        let event = ServerEvent::UserJoined {
            username: "ana".into(),
            user_id: SessionId("s1".into()),
            user_count: 2,
        };
        let value: Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "userJoined");
        assert_eq!(value["data"]["userId"], "s1");
        assert_eq!(value["data"]["userCount"], 2);
    }

    #[test]
    fn snapshot_serializes_member_host_flags() {
        let snapshot = RoomSnapshot {
            room_id: RoomId("r".into()),
            room_name: "Movie Night".into(),
            movie_link: "https://example.com/v".into(),
            genre_tag: "General".into(),
            messages: vec![],
            reactions: vec![],
            sync_time: 0.0,
            is_playing: true,
            user_count: 1,
            is_host: true,
            host_id: Some(SessionId("s1".into())),
            users: vec![MemberInfo {
                id: SessionId("s1".into()),
                username: "ana".into(),
                is_host: true,
            }],
        };
        let value: Value = serde_json::to_value(ServerEvent::RoomState(snapshot)).unwrap();
        assert_eq!(value["event"], "roomState");
        assert_eq!(value["data"]["isHost"], true);
        assert_eq!(value["data"]["hostId"], "s1");
        assert_eq!(value["data"]["users"][0]["isHost"], true);
    }
}
