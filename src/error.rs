use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TikaError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u16)]
pub enum ErrorCode {
    InvalidArgument = 1,
    NotFound = 2,
    NotFoundRemote = 3,
    Io = 4,
    TransportTransient = 10,
    TransportFatal = 11,
    UnknownRequestType = 12,
    EmptyResponse = 20,
    ResponseFormat = 21,
    Configuration = 30,
    VersionUnsupported = 31,
}

#[derive(Debug, Error)]
pub enum TikaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation exists but the active transport does not support it.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("remote file is not reachable: {url} ({reason})")]
    NotFoundRemote { url: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("downloading {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// Connection refused, HTTP timeout or process launch failure.
    #[error("transient transport failure: {message}")]
    TransportTransient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Non-success status or exit code; `status` is the HTTP status or the
    /// process exit code when one is known.
    #[error("transport failed (status {status:?}): {message}")]
    TransportFatal {
        status: Option<i32>,
        message: String,
    },

    #[error("unknown request type: {0}")]
    UnknownRequestType(String),

    #[error("empty response for {file}")]
    EmptyResponse { file: String },

    #[error("unexpected response for {file}: {reason}")]
    ResponseFormat { file: String, reason: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("engine version {0} is not supported")]
    VersionUnsupported(String),
}

impl TikaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TikaError::InvalidArgument(_) | TikaError::Unsupported(_) => ErrorCode::InvalidArgument,
            TikaError::NotFound { .. } => ErrorCode::NotFound,
            TikaError::NotFoundRemote { .. } => ErrorCode::NotFoundRemote,
            TikaError::Io { .. } | TikaError::Download { .. } => ErrorCode::Io,
            TikaError::TransportTransient { .. } => ErrorCode::TransportTransient,
            TikaError::TransportFatal { .. } => ErrorCode::TransportFatal,
            TikaError::UnknownRequestType(_) => ErrorCode::UnknownRequestType,
            TikaError::EmptyResponse { .. } => ErrorCode::EmptyResponse,
            TikaError::ResponseFormat { .. } => ErrorCode::ResponseFormat,
            TikaError::Configuration(_) => ErrorCode::Configuration,
            TikaError::VersionUnsupported(_) => ErrorCode::VersionUnsupported,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, TikaError::TransportTransient { .. })
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        TikaError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn transient(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        TikaError::TransportTransient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn format(file: impl Into<String>, reason: impl Into<String>) -> Self {
        TikaError::ResponseFormat {
            file: file.into(),
            reason: reason.into(),
        }
    }
}
