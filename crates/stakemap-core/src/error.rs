pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The data-fetch collaborator failed or returned nothing. This is an upstream condition,
    /// never a layout error.
    #[error("Ownership data unavailable: {reason}")]
    DataUnavailable { reason: String },

    #[error("Invalid ownership tree: {message}")]
    InvalidTree { message: String },

    #[error("Ownership tree JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
