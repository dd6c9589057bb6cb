use agora_protocol::ProtocolError;
use agora_transport::TransportError;
use thiserror::Error;

/// Errors surfaced by the hub layer.
#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The hub's connection task has already exited.
    #[error("hub '{0}' is stopped")]
    Stopped(String),
}
