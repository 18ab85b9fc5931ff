use std::fmt;

/// Result type for skyrelay operations
pub type Result<T> = std::result::Result<T, SkyrelayError>;

/// Main error type for the skyrelay library
#[derive(Debug, Clone)]
pub enum SkyrelayError {
    /// Map rejected at construction (start/terminal on an obstacle,
    /// out-of-bounds obstacle, degenerate dimensions)
    InvalidMapConfiguration(String),

    /// Action outside the legal set for the current cell
    InvalidAction { action: usize, cell: (usize, usize) },

    /// Stored policy cannot be parsed or does not match the configured
    /// state/action space
    CheckpointFormat(String),

    /// Sampling requested before the buffer reached its minimum fill
    ReplayBufferUnderflow { len: usize, requested: usize },

    /// IO errors (file operations)
    Io(String),

    /// Serialization/deserialization errors
    Serialization(String),
}

impl fmt::Display for SkyrelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkyrelayError::InvalidMapConfiguration(msg) => {
                write!(f, "Invalid map configuration: {}", msg)
            }
            SkyrelayError::InvalidAction { action, cell } => {
                write!(
                    f,
                    "Action {} is not legal at cell ({}, {})",
                    action, cell.0, cell.1
                )
            }
            SkyrelayError::CheckpointFormat(msg) => {
                write!(f, "Checkpoint format error: {}", msg)
            }
            SkyrelayError::ReplayBufferUnderflow { len, requested } => {
                write!(
                    f,
                    "Replay buffer underflow: {} transitions stored, {} requested",
                    len, requested
                )
            }
            SkyrelayError::Io(msg) => write!(f, "IO error: {}", msg),
            SkyrelayError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for SkyrelayError {}

impl From<std::io::Error> for SkyrelayError {
    fn from(err: std::io::Error) -> Self {
        SkyrelayError::Io(err.to_string())
    }
}

impl From<bincode::Error> for SkyrelayError {
    fn from(err: bincode::Error) -> Self {
        SkyrelayError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SkyrelayError {
    fn from(err: serde_json::Error) -> Self {
        SkyrelayError::Serialization(err.to_string())
    }
}
