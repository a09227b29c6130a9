use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid ingestor state: {0}")]
    InvalidState(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl MonitorError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MonitorError::Cancelled)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for MonitorError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        MonitorError::Transport(e.to_string())
    }
}

pub type MonitorResult<T> = Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_errors_become_transport() {
        let error = MonitorError::from(tokio_tungstenite::tungstenite::Error::ConnectionClosed);
        assert!(matches!(error, MonitorError::Transport(_)));
        assert!(!error.is_cancelled());
        assert!(MonitorError::Cancelled.is_cancelled());
    }
}
