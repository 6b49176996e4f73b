use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("Connection failed: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Source returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] pgelastic::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MigrateError>;
