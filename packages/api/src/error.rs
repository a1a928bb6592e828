//! Errors surfaced by the producer-facing API.

use broker::{HandlerError, QueueError};
use db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

pub type ApiResult<T> = Result<T, ApiError>;
