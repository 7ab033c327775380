use thiserror::Error;

/// Errors that can occur while resolving translation references.
///
/// Missing objects, sites and types are not errors; they resolve to `None`.
#[derive(Error, Debug)]
pub enum RefTreeError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("store error: {message} (object type: {object_type})")]
    Store {
        message: String,
        object_type: String,
    },

    #[error("database error: {message} (operation: {operation})")]
    Database { message: String, operation: String },

    #[error("catalog error: {message}")]
    Catalog { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl RefTreeError {
    /// The error raised when an extended reference is requested from a builder
    /// that has no additional-fields resolver.
    pub fn fields_not_configured() -> Self {
        RefTreeError::Configuration {
            message: "resolver not configured for additional fields".to_string(),
        }
    }
}

/// Convenience alias for results using `RefTreeError`.
pub type Result<T> = std::result::Result<T, RefTreeError>;
