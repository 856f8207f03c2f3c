//! Error types for Easelcast

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EaselError>;

#[derive(Error, Debug)]
pub enum EaselError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Destination error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The rotation found nothing to publish even after rolling the round
    /// over. The library is empty or the destination set is misconfigured.
    #[error("No eligible content: the library is empty or the destination set is misconfigured")]
    NoEligibleContent,
}

impl EaselError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            EaselError::InvalidInput(_) => 3,
            EaselError::NoEligibleContent => 4,
            EaselError::Platform(PlatformError::Authentication(_)) => 2,
            EaselError::Platform(_) => 1,
            EaselError::Config(_) => 1,
            EaselError::Store(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    #[error("Destination not configured: {0}")]
    Unconfigured(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}
