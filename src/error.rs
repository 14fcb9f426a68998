use thiserror::Error;

/// Why a feed could not be fetched. Callers treat every variant the same
/// way; the split only exists for diagnostics.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid RSS document: {0}")]
    Parse(#[from] rss::Error),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    Conflict(String),

    #[error("no logged in user, run `login <name>` or `register <name>` first")]
    Unauthenticated,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("failed to fetch feed: {0}")]
    Fetch(#[from] FetchError),

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.into())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// True when `err` is SQLite refusing a row because of a UNIQUE constraint.
pub fn is_unique_violation(err: &tokio_rusqlite::Error) -> bool {
    match err {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}
