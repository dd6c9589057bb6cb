use thiserror::Error;

/// Top-level error type, wrapping each layer's errors.
#[derive(Debug, Error)]
pub enum AgoraError {
    #[error(transparent)]
    Transport(#[from] agora_transport::TransportError),

    #[error(transparent)]
    Protocol(#[from] agora_protocol::ProtocolError),

    #[error(transparent)]
    Session(#[from] agora_session::SessionError),

    #[error(transparent)]
    Hub(#[from] agora_hub::HubError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_converts() {
        let err: AgoraError = agora_session::SessionError::InvalidToken.into();
        assert!(matches!(err, AgoraError::Session(_)));
    }

    #[test]
    fn test_transport_error_preserves_message() {
        let err: AgoraError =
            agora_transport::TransportError::ConnectFailed("refused".into()).into();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_hub_error_converts() {
        let err: AgoraError = agora_hub::HubError::Stopped("cartHub".into()).into();
        assert!(matches!(err, AgoraError::Hub(_)));
    }
}
