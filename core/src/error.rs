use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("User '{user_id}' not found")]
    UnknownUser { user_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CalcResult<T> = Result<T, CalcError>;
