use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Db(#[from] matraca_db::DbError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] matraca_gateway::GatewayError),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
