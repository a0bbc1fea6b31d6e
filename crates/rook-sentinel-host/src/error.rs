//! Host error type.

/// All errors that can occur in the standalone host.
#[derive(thiserror::Error, Debug)]
pub enum HostError {
    #[error("Page not readable: {0}")]
    Page(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Detection error: {0}")]
    Sentinel(#[from] rook_sentinel::SentinelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HostResult<T> = Result<T, HostError>;
