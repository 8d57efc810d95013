use std::time::Duration;
use thiserror::Error;

// Bridge error taxonomy
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Connection error: could not reach {endpoint} after {attempts} attempts: {source}")]
    Connection {
        endpoint: String,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Peer closed the connection")]
    PeerClosed,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BridgeError {
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, BridgeError::PeerClosed)
    }
}
