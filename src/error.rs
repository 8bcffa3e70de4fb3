#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::error::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("[{university}] unrecognized document structure: {detail}")]
    Structure {
        university: &'static str,
        detail: String,
    },

    #[error("field `{key}` must be a string or null, found {found}")]
    Mapping { key: String, found: &'static str },

    #[error("invalid page request (page = {page}, size = {size})")]
    InvalidPage { page: u32, size: u32 },
}
