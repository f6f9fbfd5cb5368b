use thiserror::Error;
use uuid::Uuid;

/// Failure talking to the row store, whichever backend is behind it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("application {id} not found")]
    NotFound { id: Uuid },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("store rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid stored row: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Required fields left blank on submit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required field(s): {}", .missing.join(", "))]
pub struct ValidationError {
    pub missing: Vec<&'static str>,
}

impl ValidationError {
    pub(crate) fn check(missing: Vec<&'static str>) -> Result<(), ValidationError> {
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("not signed in")]
    AuthRequired,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
