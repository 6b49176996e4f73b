use thiserror::Error;

/// Failure kinds shared by the store, the query compiler and the bulk processor.
///
/// Every kind carries a human-readable reason and renders into the
/// Elasticsearch error envelope through [`Error::error_type`] and [`Error::reason`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Unparseable body or a wrongly shaped query tree
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Backend execution or I/O failure, carrying the backend's message
    #[error("Query failure: {0}")]
    QueryFailure(String),

    /// Duplicate create, missing update target, unsatisfiable search
    #[error("Illegal operation: {0}")]
    IllegalOperation(String),

    /// Request body could not be read
    #[error("Transport I/O error: {0}")]
    TransportIo(String),

    /// Unexpected state inside pgelastic itself
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Wire `type` of the error envelope
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "json_parse_exception",
            Self::QueryFailure(_) => "db_query_exception",
            Self::IllegalOperation(_) => "illegal_query_exception",
            Self::TransportIo(_) => "internal_io_exception",
            Self::Internal(_) => "internal_exception",
        }
    }

    /// Wire `reason` of the error envelope
    pub fn reason(&self) -> &str {
        match self {
            Self::MalformedInput(r)
            | Self::QueryFailure(r)
            | Self::IllegalOperation(r)
            | Self::TransportIo(r)
            | Self::Internal(r) => r,
        }
    }

    /// Whether a bulk item failing with this error may be reported per item
    /// while the rest of the batch keeps running.
    pub fn is_item_recoverable(&self) -> bool {
        matches!(self, Self::QueryFailure(_) | Self::IllegalOperation(_))
    }

    /// HTTP status used for the top-level envelope and for bulk item errors
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedInput(_) | Self::IllegalOperation(_) => 400,
            Self::QueryFailure(_) | Self::TransportIo(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::QueryFailure(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
