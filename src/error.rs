//! Error types for the polyglot bot.

/// Top-level error type for turn processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Errors raised while loading or flushing per-user / per-conversation state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The storage backend rejected a read or a flush. The turn is not
    /// durably completed; replies may already have been delivered.
    #[error("Persistence failure for {scope} state of {owner_id}: {source}")]
    PersistenceFailure {
        scope: String,
        owner_id: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Stored property {property} is corrupt: {reason}")]
    Corrupt { property: String, reason: String },
}

/// Dialog engine errors.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Unknown dialog id: {id}")]
    UnknownDialogId { id: String },

    #[error("Dialog id already registered: {id}")]
    DuplicateDialogId { id: String },

    /// A resume arrived that no suspended dialog can accept. Recovered by the
    /// router, which handles the message as a fresh command.
    #[error("Dialog state lost: {reason}")]
    LostDialogState { reason: String },

    #[error("Invalid options for dialog {id}: {reason}")]
    InvalidOptions { id: String, reason: String },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
