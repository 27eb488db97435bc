use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, BrowserError>;

/// Browser error types.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// I/O errors from filesystem access.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user or a listing request.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A path lookup in the folder tree found no node.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The listing source could not produce a listing.
    #[error("Listing failed for '{path}': {reason}")]
    FetchFailed { path: String, reason: String },

    /// Preference storage could not be read or written.
    #[error("Preferences error: {0}")]
    Prefs(#[from] serde_json::Error),
}

impl BrowserError {
    /// Wrap any displayable failure as a listing failure for `path`.
    pub fn fetch_failed(path: &str, reason: impl std::fmt::Display) -> Self {
        BrowserError::FetchFailed {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}
