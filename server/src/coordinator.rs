//! The per-room state machine.
//!
//! Every realtime event lands here: membership changes, host hand-off,
//! chat/reaction append + broadcast, playback-sync gate-keeping, and poll
//! relay. Each event runs its check-and-mutate step inside the target room's
//! entry lock and collects the resulting deliveries into an outbox, which is
//! flushed after the lock is released. Locks are acquired room first, then
//! session, never the reverse.

use std::sync::Arc;

use chrono::Utc;
use watchroom_protocol::{
    ChatMessage, ClientEvent, MemberInfo, Poll, PollOption, Reaction, RoomId, RoomSnapshot,
    ServerEvent, SessionId,
};

use crate::error::RejectReason;
use crate::registry::{Room, RoomRegistry};
use crate::session::SessionManager;

/// Deliveries computed under a room lock, sent once it is released.
type Outbox = Vec<(SessionId, ServerEvent)>;

/// Applies client events to room state and fans the results out.
pub struct Coordinator {
    registry: Arc<RoomRegistry>,
    sessions: Arc<SessionManager>,
}

impl Coordinator {
    pub fn new(registry: Arc<RoomRegistry>, sessions: Arc<SessionManager>) -> Self {
        Self { registry, sessions }
    }

    /// Dispatch one client event. Rejections are reported privately to the
    /// requester (playback-sync failures as `syncError`, everything else as
    /// `roomError`) and never touch other rooms or sessions.
    pub fn handle_event(&self, session: &SessionId, event: ClientEvent) {
        match event {
            ClientEvent::JoinRoom {
                room_id,
                username,
                password,
            } => {
                let result = self.join_room(session, &room_id, username, password);
                self.report_room(session, result);
            }
            ClientEvent::LeaveRoom { room_id } => self.leave_room(session, &room_id),
            ClientEvent::SendMessage { room_id, text } => {
                let result = self.send_message(session, &room_id, text);
                self.report_room(session, result);
            }
            ClientEvent::SendReaction {
                room_id,
                emoji,
                timestamp,
            } => {
                let result = self.send_reaction(session, &room_id, emoji, timestamp);
                self.report_room(session, result);
            }
            ClientEvent::SyncMovieState {
                room_id,
                current_time,
                is_playing,
            } => {
                let result = self.sync_movie_state(session, &room_id, current_time, is_playing);
                self.report_sync(session, result);
            }
            ClientEvent::RequestSync { room_id } => {
                let result = self.request_sync(session, &room_id);
                self.report_sync(session, result);
            }
            ClientEvent::CreatePoll {
                room_id,
                question,
                options,
            } => {
                let result = self.create_poll(session, &room_id, question, options);
                self.report_room(session, result);
            }
            ClientEvent::VotePoll {
                room_id,
                poll_id,
                option_index,
            } => {
                let result = self.vote_poll(session, &room_id, poll_id, option_index);
                self.report_room(session, result);
            }
        }
    }

    // ========================================================================
    // Join / leave
    // ========================================================================

    /// Admit a session into a room and reply with the full snapshot.
    pub fn join_room(
        &self,
        session: &SessionId,
        room_id: &RoomId,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<(), RejectReason> {
        let username = self.resolve_username(session, username)?;

        // Re-emitting joinRoom for the current room just refreshes the
        // snapshot; membership and host stay as they are.
        if self.sessions.room_of(session).as_ref() == Some(room_id) {
            let snapshot = self
                .registry
                .with_room(room_id, |room| self.snapshot_for(room, session, &username))
                .ok_or(RejectReason::RoomNotFound)?;
            self.sessions.set_username(session, username);
            self.sessions.send(session, ServerEvent::RoomState(snapshot));
            return Ok(());
        }

        // Joining a different room leaves the old one first.
        if let Some(old_room) = self.sessions.room_of(session) {
            self.remove_from_room(session, &old_room);
        }

        let (snapshot, outbox) = self
            .registry
            .with_room_mut(room_id, |room| {
                if !room.password_matches(password.as_deref()) {
                    return Err(RejectReason::InvalidPassword);
                }

                room.members.push(session.clone());
                if room.host.is_none() {
                    // First arrival after emptiness takes the host seat.
                    room.host = Some(session.clone());
                    tracing::info!(room_id = %room.id, username = %username, "host assigned");
                }

                let joined = ServerEvent::UserJoined {
                    username: username.clone(),
                    user_id: session.clone(),
                    user_count: room.user_count(),
                };
                let outbox: Outbox = room
                    .members
                    .iter()
                    .filter(|member| *member != session)
                    .map(|member| (member.clone(), joined.clone()))
                    .collect();

                tracing::info!(
                    room_id = %room.id,
                    username = %username,
                    user_count = room.user_count(),
                    "user joined room"
                );
                Ok((self.snapshot_for(room, session, &username), outbox))
            })
            .ok_or(RejectReason::RoomNotFound)??;

        self.sessions.set_username(session, username);
        self.sessions.set_room(session, Some(room_id.clone()));

        self.deliver(outbox);
        self.sessions.send(session, ServerEvent::RoomState(snapshot));
        Ok(())
    }

    /// Explicit leave request. No-op unless the session is bound to the
    /// named room.
    pub fn leave_room(&self, session: &SessionId, room_id: &RoomId) {
        if self.sessions.room_of(session).as_ref() != Some(room_id) {
            return;
        }
        self.remove_from_room(session, room_id);
    }

    /// Transport disconnect. Runs the same leave logic as an explicit
    /// request, then drops the session.
    pub fn handle_disconnect(&self, session: &SessionId) {
        if let Some(room_id) = self.sessions.room_of(session) {
            self.remove_from_room(session, &room_id);
        }
        if let Some((username, _)) = self.sessions.unregister(session) {
            tracing::debug!(session_id = %session, username = %username, "session disconnected");
        }
    }

    /// Shared leave path: membership removal, host hand-off, departure
    /// broadcast, empty-room destruction.
    fn remove_from_room(&self, session: &SessionId, room_id: &RoomId) {
        let username = self
            .sessions
            .username(session)
            .unwrap_or_else(|| "Unknown".to_string());

        let outcome = self.registry.with_room_mut(room_id, |room| {
            let position = room.members.iter().position(|member| member == session)?;
            room.members.remove(position);
            let was_host = room.is_host(session);

            if room.members.is_empty() {
                room.host = None;
                return Some((Outbox::new(), true));
            }

            let mut outbox = Outbox::new();
            if was_host {
                // Hand off to the earliest remaining joiner.
                let new_host_id = room.members[0].clone();
                let new_host_username = self
                    .sessions
                    .username(&new_host_id)
                    .unwrap_or_else(|| "Unknown".to_string());
                room.host = Some(new_host_id.clone());
                tracing::info!(
                    room_id = %room.id,
                    new_host = %new_host_username,
                    "host changed"
                );

                let changed = ServerEvent::HostChanged {
                    new_host_id,
                    new_host_username,
                };
                outbox.extend(
                    room.members
                        .iter()
                        .map(|member| (member.clone(), changed.clone())),
                );
            }

            let left = ServerEvent::UserLeft {
                username: username.clone(),
                user_id: session.clone(),
                user_count: room.user_count(),
            };
            outbox.extend(
                room.members
                    .iter()
                    .map(|member| (member.clone(), left.clone())),
            );
            Some((outbox, false))
        });

        self.sessions.set_room(session, None);

        let Some(Some((outbox, now_empty))) = outcome else {
            return;
        };
        tracing::info!(room_id = %room_id, username = %username, "user left room");
        if now_empty {
            self.registry.remove(room_id);
        }
        self.deliver(outbox);
    }

    // ========================================================================
    // Chat & reactions
    // ========================================================================

    /// Append a chat message and broadcast it to every member, sender
    /// included: the canonical broadcast is the single source of ordering
    /// truth.
    pub fn send_message(
        &self,
        session: &SessionId,
        room_id: &RoomId,
        text: String,
    ) -> Result<(), RejectReason> {
        let username = self
            .sessions
            .username(session)
            .ok_or(RejectReason::NotInRoom)?;

        let outbox = self
            .registry
            .with_room_mut(room_id, |room| {
                if !room.is_member(session) {
                    return Err(RejectReason::NotInRoom);
                }
                let message = ChatMessage {
                    id: room.next_entry_id(),
                    username: username.clone(),
                    user_id: session.clone(),
                    text,
                    timestamp: Utc::now(),
                };
                room.messages.push(message.clone());
                Ok(broadcast_to(&room.members, ServerEvent::NewMessage(message)))
            })
            .ok_or(RejectReason::RoomNotFound)??;

        self.deliver(outbox);
        Ok(())
    }

    /// Append an emoji reaction and broadcast it to every member.
    pub fn send_reaction(
        &self,
        session: &SessionId,
        room_id: &RoomId,
        emoji: String,
        timestamp: f64,
    ) -> Result<(), RejectReason> {
        let username = self
            .sessions
            .username(session)
            .ok_or(RejectReason::NotInRoom)?;

        let outbox = self
            .registry
            .with_room_mut(room_id, |room| {
                if !room.is_member(session) {
                    return Err(RejectReason::NotInRoom);
                }
                let reaction = Reaction {
                    id: room.next_entry_id(),
                    emoji,
                    timestamp,
                    username: username.clone(),
                    user_id: session.clone(),
                    created_at: Utc::now(),
                };
                room.reactions.push(reaction.clone());
                Ok(broadcast_to(
                    &room.members,
                    ServerEvent::NewReaction(reaction),
                ))
            })
            .ok_or(RejectReason::RoomNotFound)??;

        self.deliver(outbox);
        Ok(())
    }

    // ========================================================================
    // Playback sync
    // ========================================================================

    /// Host-driven playback update. Authority is checked against the room's
    /// current host under the room lock, at the instant of the request; a
    /// non-host request mutates nothing and broadcasts nothing.
    pub fn sync_movie_state(
        &self,
        session: &SessionId,
        room_id: &RoomId,
        current_time: f64,
        is_playing: bool,
    ) -> Result<(), RejectReason> {
        let username = self
            .sessions
            .username(session)
            .ok_or(RejectReason::NotInRoom)?;

        let outbox = self
            .registry
            .with_room_mut(room_id, |room| {
                if !room.is_host(session) {
                    // Abuse signal: guests never get playback authority.
                    tracing::warn!(
                        room_id = %room.id,
                        session_id = %session,
                        username = %username,
                        "rejected playback sync from non-host"
                    );
                    return Err(RejectReason::NotHost);
                }

                room.sync_time = current_time;
                room.is_playing = is_playing;

                let updated = ServerEvent::MovieStateUpdated {
                    current_time,
                    is_playing,
                    synced_by: Some(username.clone()),
                    server_time: Utc::now().timestamp_millis(),
                };
                // The host already has this state locally; echoing it back
                // would feed its own update loop.
                Ok(room
                    .members
                    .iter()
                    .filter(|member| *member != session)
                    .map(|member| (member.clone(), updated.clone()))
                    .collect::<Outbox>())
            })
            .ok_or(RejectReason::RoomNotFound)??;

        self.deliver(outbox);
        Ok(())
    }

    /// Drift check from any member: private reply with the current
    /// authoritative state, no mutation, no broadcast.
    pub fn request_sync(&self, session: &SessionId, room_id: &RoomId) -> Result<(), RejectReason> {
        let reply = self
            .registry
            .with_room(room_id, |room| {
                if !room.is_member(session) {
                    return Err(RejectReason::NotInRoom);
                }
                Ok(ServerEvent::MovieStateUpdated {
                    current_time: room.sync_time,
                    is_playing: room.is_playing,
                    synced_by: None,
                    server_time: Utc::now().timestamp_millis(),
                })
            })
            .ok_or(RejectReason::RoomNotFound)??;

        self.sessions.send(session, reply);
        Ok(())
    }

    // ========================================================================
    // Polls
    // ========================================================================

    /// Broadcast a poll to the room. Relay only: polls are not stored in
    /// room state and votes are never tallied server-side.
    pub fn create_poll(
        &self,
        session: &SessionId,
        room_id: &RoomId,
        question: String,
        options: Vec<String>,
    ) -> Result<(), RejectReason> {
        let username = self
            .sessions
            .username(session)
            .ok_or(RejectReason::NotInRoom)?;

        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(RejectReason::Validation(
                "Poll question cannot be empty".to_string(),
            ));
        }
        if options.len() < 2 {
            return Err(RejectReason::Validation(
                "A poll needs at least two options".to_string(),
            ));
        }

        let outbox = self
            .registry
            .with_room_mut(room_id, |room| {
                if !room.is_member(session) {
                    return Err(RejectReason::NotInRoom);
                }
                let poll = Poll {
                    id: room.next_entry_id(),
                    question: question.clone(),
                    options: options
                        .iter()
                        .map(|text| PollOption {
                            text: text.clone(),
                            votes: Vec::new(),
                        })
                        .collect(),
                    created_by: username.clone(),
                    created_at: Utc::now(),
                };
                Ok(broadcast_to(&room.members, ServerEvent::NewPoll(poll)))
            })
            .ok_or(RejectReason::RoomNotFound)??;

        self.deliver(outbox);
        Ok(())
    }

    /// Relay a vote to the room without tallying it.
    pub fn vote_poll(
        &self,
        session: &SessionId,
        room_id: &RoomId,
        poll_id: u64,
        option_index: usize,
    ) -> Result<(), RejectReason> {
        let username = self
            .sessions
            .username(session)
            .ok_or(RejectReason::NotInRoom)?;

        let outbox = self
            .registry
            .with_room(room_id, |room| {
                if !room.is_member(session) {
                    return Err(RejectReason::NotInRoom);
                }
                let voted = ServerEvent::PollVoted {
                    poll_id,
                    option_index,
                    user_id: session.clone(),
                    username: username.clone(),
                };
                Ok(broadcast_to(&room.members, voted))
            })
            .ok_or(RejectReason::RoomNotFound)??;

        self.deliver(outbox);
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Effective display name for a join: the supplied name when present
    /// (validated), otherwise whatever the session already carries.
    fn resolve_username(
        &self,
        session: &SessionId,
        provided: Option<String>,
    ) -> Result<String, RejectReason> {
        match provided {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(RejectReason::Validation(
                        "Username cannot be empty".to_string(),
                    ));
                }
                if name.len() > 32 {
                    return Err(RejectReason::Validation(
                        "Username too long (max 32 chars)".to_string(),
                    ));
                }
                Ok(name)
            }
            None => self
                .sessions
                .username(session)
                .ok_or_else(|| RejectReason::Validation("Session not registered".to_string())),
        }
    }

    /// Full room state for the joining session, member list annotated with
    /// host flags.
    fn snapshot_for(&self, room: &Room, session: &SessionId, username: &str) -> RoomSnapshot {
        let users = room
            .members
            .iter()
            .map(|member| MemberInfo {
                id: member.clone(),
                username: if member == session {
                    username.to_string()
                } else {
                    self.sessions
                        .username(member)
                        .unwrap_or_else(|| "Unknown".to_string())
                },
                is_host: room.is_host(member),
            })
            .collect();

        RoomSnapshot {
            room_id: room.id.clone(),
            room_name: room.name.clone(),
            movie_link: room.movie_link.clone(),
            genre_tag: room.genre_tag.clone(),
            messages: room.messages.clone(),
            reactions: room.reactions.clone(),
            sync_time: room.sync_time,
            is_playing: room.is_playing,
            user_count: room.user_count(),
            is_host: room.is_host(session),
            host_id: room.host.clone(),
            users,
        }
    }

    fn report_room(&self, session: &SessionId, result: Result<(), RejectReason>) {
        if let Err(reason) = result {
            self.sessions.send(
                session,
                ServerEvent::RoomError {
                    message: reason.to_string(),
                },
            );
        }
    }

    fn report_sync(&self, session: &SessionId, result: Result<(), RejectReason>) {
        if let Err(reason) = result {
            self.sessions.send(
                session,
                ServerEvent::SyncError {
                    message: reason.to_string(),
                },
            );
        }
    }

    fn deliver(&self, outbox: Outbox) {
        for (target, event) in outbox {
            self.sessions.send(&target, event);
        }
    }
}

fn broadcast_to(members: &[SessionId], event: ServerEvent) -> Outbox {
    members
        .iter()
        .map(|member| (member.clone(), event.clone()))
        .collect()
}
