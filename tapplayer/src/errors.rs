use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlayerError {
    // Socket refused, reset or timed out
    #[error("Transport Error: {0}")]
    Transport(String),
    #[error("Protocol Error: {0}")]
    Protocol(String),
    #[error("Daemon answered `{command}` with {message}")]
    DaemonAck { command: String, message: String },
    #[error("No connection to {0}")]
    NotConnected(String),
    #[error("Media engine Error: {0}")]
    Engine(String),
    #[error("Player operation '{0}' is not supported by backend '{1}'")]
    OperationNotSupported(String, String),
    #[error("Invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("Invalid url: {0}")]
    InvalidUrl(String),
    #[error("Configuration Error: {0}")]
    Config(String),
}

impl PlayerError {
    pub fn transport(message: impl Into<String>) -> Self {
        PlayerError::Transport(message.into())
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        PlayerError::Protocol(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        PlayerError::Engine(message.into())
    }

    pub fn not_supported(operation: &str, backend: &str) -> Self {
        PlayerError::OperationNotSupported(operation.to_string(), backend.to_string())
    }

    /// True for failures that mean "backend temporarily unavailable".
    pub fn is_transport(&self) -> bool {
        matches!(self, PlayerError::Transport(_) | PlayerError::NotConnected(_))
    }
}

impl From<std::io::Error> for PlayerError {
    fn from(err: std::io::Error) -> Self {
        PlayerError::Transport(err.to_string())
    }
}
