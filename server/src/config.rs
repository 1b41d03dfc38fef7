//! Environment-driven server configuration.

use serde::Deserialize;

use crate::error::ServerError;

/// Server configuration, read from the environment (`LISTEN_ADDR`,
/// `SEED_ROOMS`). A `.env` file in the working directory is honored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket server binds.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Seed sample public rooms at startup.
    #[serde(default)]
    pub seed_rooms: bool,
}

fn default_listen_addr() -> String {
    "0.0.0.0:4000".to_string()
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        dotenv::dotenv().ok();
        envy::from_env().map_err(|e| ServerError::Config(e.to_string()))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            seed_rooms: false,
        }
    }
}
