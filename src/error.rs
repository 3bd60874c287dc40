use std::path::PathBuf;

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem or preference-file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Preference document could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem watcher could not be created or attached.
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Target of a rename or create already exists.
    #[error("Already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// A file that was asked for explicitly is missing.
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),
}
