use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "firebase")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[cfg(feature = "firebase")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("{0}")]
    Other(String),
}
