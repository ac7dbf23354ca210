use thiserror::Error;

/// Track synthesis error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Non-finite input: {0}")]
    NonFinite(String),

    #[error("Invalid speed band: {0}")]
    InvalidSpeedBand(String),

    #[error("Unknown speed mode: {0}")]
    UnknownSpeedMode(String),

    #[error("Unknown coordinate frame: {0}")]
    UnknownFrame(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),
}

/// Result type for track synthesis operations
pub type Result<T> = std::result::Result<T, TrackError>;

