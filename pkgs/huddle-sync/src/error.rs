use huddle_store::StoreError;
use thiserror::Error;

use crate::title::TitleError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No current user")]
    Unauthenticated,

    #[error("Not a participant of session {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    TransientStore(#[from] StoreError),

    #[error("External service error: {0}")]
    ExternalService(#[from] TitleError),
}

pub type SyncResult<T> = Result<T, SyncError>;
