//! Room entities and the registry that owns their lifecycle.
//!
//! The registry is the exclusive owner of all [`Room`] state. Callers never
//! hold a room outside the registry: reads and mutations go through
//! [`RoomRegistry::with_room`] / [`RoomRegistry::with_room_mut`], which run
//! inside the room's map entry lock. That serializes all mutation of one
//! room's fields, which is the only concurrency hazard in this design.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use watchroom_protocol::{ChatMessage, Reaction, RoomId, SessionId};

use crate::error::RejectReason;

/// Cap on the public room listing.
pub const PUBLIC_LIST_LIMIT: usize = 20;

/// A watch room. Metadata is immutable after creation; membership, history,
/// and playback state evolve through the coordinator.
pub struct Room {
    pub id: RoomId,
    pub movie_link: String,
    pub name: String,
    pub genre_tag: String,
    pub poster_image: Option<String>,
    pub is_private: bool,
    /// Stored only for private rooms, compared verbatim on join.
    password: Option<String>,
    /// Members in join order; the front is the earliest remaining joiner,
    /// which is who host hand-off falls to.
    pub members: Vec<SessionId>,
    pub host: Option<SessionId>,
    pub messages: Vec<ChatMessage>,
    pub reactions: Vec<Reaction>,
    /// Last authoritative playback position, seconds.
    pub sync_time: f64,
    pub is_playing: bool,
    pub created_at: DateTime<Utc>,
    next_entry_id: u64,
}

impl Room {
    fn new(id: RoomId, params: CreateRoomParams, movie_link: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            movie_link,
            name: params
                .room_name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Untitled Room".to_string()),
            genre_tag: params
                .genre_tag
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| "General".to_string()),
            poster_image: params.poster_image,
            is_private: params.is_private,
            password: if params.is_private { params.password } else { None },
            members: Vec::new(),
            host: None,
            messages: Vec::new(),
            reactions: Vec::new(),
            sync_time: 0.0,
            // The host auto-plays on arrival.
            is_playing: true,
            created_at,
            next_entry_id: 0,
        }
    }

    /// Verbatim password check. Public rooms admit anyone.
    pub fn password_matches(&self, supplied: Option<&str>) -> bool {
        if !self.is_private {
            return true;
        }
        self.password.as_deref() == supplied
    }

    pub fn is_member(&self, session: &SessionId) -> bool {
        self.members.contains(session)
    }

    pub fn is_host(&self, session: &SessionId) -> bool {
        self.host.as_ref() == Some(session)
    }

    pub fn user_count(&self) -> usize {
        self.members.len()
    }

    /// Next id for a message, reaction, or poll. Monotonic within the room.
    pub fn next_entry_id(&mut self) -> u64 {
        self.next_entry_id += 1;
        self.next_entry_id
    }
}

/// Room creation input, as posted to `POST /rooms/create`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomParams {
    pub movie_link: Option<String>,
    pub room_name: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    pub password: Option<String>,
    pub genre_tag: Option<String>,
    pub poster_image: Option<String>,
}

/// Public listing entry for the room browser. Member counts are computed
/// live at listing time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListing {
    pub id: RoomId,
    pub name: String,
    pub genre_tag: String,
    pub poster_image: Option<String>,
    pub user_count: usize,
    pub created_at: DateTime<Utc>,
}

/// In-memory table of all live rooms.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Create a room with a fresh opaque id, empty membership, and no host.
    /// Fails only on malformed input: a missing or blank movie link.
    pub fn create_room(&self, params: CreateRoomParams) -> Result<RoomId, RejectReason> {
        self.create_room_at(params, Utc::now())
    }

    /// As [`create_room`](Self::create_room) with an explicit creation time.
    /// Seeding uses this to stagger listing order.
    pub fn create_room_at(
        &self,
        params: CreateRoomParams,
        created_at: DateTime<Utc>,
    ) -> Result<RoomId, RejectReason> {
        let movie_link = params
            .movie_link
            .clone()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| RejectReason::Validation("Movie link is required".to_string()))?;

        let id = RoomId(Uuid::new_v4().to_string());
        let room = Room::new(id.clone(), params, movie_link, created_at);
        tracing::info!(room_id = %id, name = %room.name, "room created");
        self.rooms.insert(id.clone(), room);
        Ok(id)
    }

    /// Run `f` against the room under its entry lock.
    pub fn with_room<R>(&self, id: &RoomId, f: impl FnOnce(&Room) -> R) -> Option<R> {
        self.rooms.get(id).map(|room| f(&room))
    }

    /// Run `f` against the room, mutably, under its entry lock. The closure
    /// is one serialized critical section per room; check-and-mutate logic
    /// belongs inside it.
    pub fn with_room_mut<R>(&self, id: &RoomId, f: impl FnOnce(&mut Room) -> R) -> Option<R> {
        self.rooms.get_mut(id).map(|mut room| f(&mut room))
    }

    /// Destroy a room. Called only by the coordinator once membership has
    /// reached zero; the id is never reachable again.
    pub fn remove(&self, id: &RoomId) {
        if self.rooms.remove(id).is_some() {
            tracing::info!(room_id = %id, "empty room destroyed");
        }
    }

    pub fn contains(&self, id: &RoomId) -> bool {
        self.rooms.contains_key(id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Public rooms, newest first, capped at `limit`. Computed on demand.
    pub fn public_rooms(&self, limit: usize) -> Vec<RoomListing> {
        let mut listings: Vec<RoomListing> = self
            .rooms
            .iter()
            .filter(|entry| !entry.is_private)
            .map(|entry| RoomListing {
                id: entry.id.clone(),
                name: entry.name.clone(),
                genre_tag: entry.genre_tag.clone(),
                poster_image: entry.poster_image.clone(),
                user_count: entry.user_count(),
                created_at: entry.created_at,
            })
            .collect();
        listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        listings.truncate(limit);
        listings
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
