use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Contact not found: {0}")]
    ContactNotFound(String),

    #[error("Could not resolve a data directory for the database")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, DbError>;
