use thiserror::Error;

/// Process-level failures. These abort startup; nothing here is reported to
/// a connected client.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP server error: {0}")]
    Http(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Why a client request was rejected.
///
/// Every variant is recoverable at the session level: the reason is reported
/// privately to the requesting session (as a `roomError` or `syncError`
/// frame) and room state is left untouched. The `Display` strings are the
/// exact client-facing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Incorrect password")]
    InvalidPassword,

    #[error("Only the host can control playback")]
    NotHost,

    #[error("Not a member of this room")]
    NotInRoom,

    #[error("{0}")]
    Validation(String),
}
