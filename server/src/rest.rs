//! REST API handlers for actix-web.
//!
//! The stateless read/create surface the presentation layer uses before a
//! WebSocket is opened. Room passwords and history are never serialized
//! here.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Serialize;
use watchroom_protocol::RoomId;

use crate::registry::{CreateRoomParams, RoomListing, RoomRegistry, PUBLIC_LIST_LIMIT};

/// Shared application state for REST handlers.
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    pub id: RoomId,
    pub name: String,
    pub is_private: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
    pub room: CreatedRoom,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetails {
    pub id: RoomId,
    pub name: String,
    pub is_private: bool,
    pub genre_tag: String,
    pub user_count: usize,
    pub movie_link: String,
}

#[derive(Serialize)]
pub struct RoomList {
    pub rooms: Vec<RoomListing>,
}

#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub message: &'static str,
}

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(Health {
        status: "OK",
        message: "Watchroom server is running",
    })
}

/// POST /rooms/create - Create a new room.
pub async fn create_room(
    body: web::Json<CreateRoomParams>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let room_id = match state.registry.create_room(body.into_inner()) {
        Ok(id) => id,
        Err(reason) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: reason.to_string(),
            });
        }
    };

    let Some(room) = state.registry.with_room(&room_id, |room| CreatedRoom {
        id: room.id.clone(),
        name: room.name.clone(),
        is_private: room.is_private,
    }) else {
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Room vanished during creation".to_string(),
        });
    };

    HttpResponse::Created().json(CreateRoomResponse { room_id, room })
}

/// GET /rooms/{room_id} - Public room info, for validation before joining.
pub async fn get_room(path: web::Path<String>, state: web::Data<AppState>) -> HttpResponse {
    let room_id = RoomId(path.into_inner());

    match state.registry.with_room(&room_id, |room| RoomDetails {
        id: room.id.clone(),
        name: room.name.clone(),
        is_private: room.is_private,
        genre_tag: room.genre_tag.clone(),
        user_count: room.user_count(),
        movie_link: room.movie_link.clone(),
    }) {
        Some(details) => HttpResponse::Ok().json(details),
        None => HttpResponse::NotFound().json(ErrorResponse {
            error: "Room not found".to_string(),
        }),
    }
}

/// GET /rooms - Public rooms for the room browser, newest first.
pub async fn list_rooms(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(RoomList {
        rooms: state.registry.public_rooms(PUBLIC_LIST_LIMIT),
    })
}
