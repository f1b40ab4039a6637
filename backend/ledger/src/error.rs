use thiserror::Error;

use crate::ballot::MAX_SELECTIONS;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Maximum {max} selections allowed, got {0}", max = MAX_SELECTIONS)]
    TooManySelections(usize),

    #[error("{name} ({year}) selected more than once")]
    DuplicateSelection { name: String, year: String },

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Error::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                Error::NotFound("Referenced record not found".to_string())
            }
            _ => Error::Database(error),
        }
    }
}

/// Maps a unique violation to a friendlier conflict message, passing any other error through.
pub(crate) fn on_conflict(message: impl Into<String>) -> impl FnOnce(sqlx::Error) -> Error {
    let message = message.into();

    move |error| match Error::from(error) {
        Error::Conflict(_) => Error::Conflict(message),
        other => other,
    }
}
