//! Watchroom: a coordination server for synchronized watch parties.
//!
//! Rooms of viewers follow one host's playback state. The server owns room
//! membership, host election and hand-off, chat/reaction broadcast, and
//! host-gated playback sync over per-session WebSockets, plus a small REST
//! surface for creating and browsing rooms. All state is in-memory and
//! single-process; rooms die with their last member and the process.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod rest;
pub mod seed;
pub mod session;
pub mod ws;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};

pub use config::ServerConfig;
pub use coordinator::Coordinator;
pub use error::{RejectReason, ServerError};
pub use registry::RoomRegistry;
pub use session::SessionManager;

/// The watchroom server.
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Run the server until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(addr = %self.config.listen_addr, "server starting");

        let registry = Arc::new(RoomRegistry::new());
        let sessions = Arc::new(SessionManager::new());
        let coordinator = Arc::new(Coordinator::new(
            Arc::clone(&registry),
            Arc::clone(&sessions),
        ));

        if self.config.seed_rooms {
            seed::seed_rooms(&registry);
        }

        let app_state = web::Data::new(rest::AppState {
            registry: Arc::clone(&registry),
        });
        let ws_state = web::Data::new(ws::WsState {
            coordinator: Arc::clone(&coordinator),
            sessions: Arc::clone(&sessions),
        });

        let listen_addr = self.config.listen_addr.clone();
        HttpServer::new(move || {
            let cors = Cors::permissive(); // Allow all origins for dev
            App::new()
                .wrap(cors)
                .app_data(app_state.clone())
                .app_data(ws_state.clone())
                .configure(routes)
        })
        .bind(&listen_addr)?
        .run()
        .await?;

        Ok(())
    }
}

/// Route table, shared with the HTTP tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(rest::health))
        .route("/rooms/create", web::post().to(rest::create_room))
        .route("/rooms", web::get().to(rest::list_rooms))
        .route("/rooms/{room_id}", web::get().to(rest::get_room))
        .route("/ws", web::get().to(ws::session_ws));
}
