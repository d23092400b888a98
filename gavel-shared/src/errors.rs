use reqwest::StatusCode;

/// Failures talking to the platform API.
///
/// Everything here is treated as transient by callers: actions and
/// ledgers catch these, log them, and move on. The one exception is
/// [`ApiError::TooOldToReply`], which callers may want to recognize so
/// they can skip instead of complain.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status {
        endpoint: String,
        status: StatusCode,
    },

    #[error("malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("{endpoint} rejected the call: {code}")]
    Rejected { endpoint: String, code: String },

    #[error("target is too old to accept replies")]
    TooOldToReply,
}

/// Outcome of a revision-conditioned wiki save.
///
/// A conflict is not a failure: the server hands back the content and
/// revision that won, and the caller reapplies its transform to that.
#[derive(Debug, thiserror::Error)]
pub enum WikiWriteError {
    #[error("wiki edit conflict")]
    Conflict { content: String, revision: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("usernotes page has schema version {found}, expected {expected}")]
    NoteSchema { found: i64, expected: i64 },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;
