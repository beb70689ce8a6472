use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Idea already exists in favorites: {0}")]
    Duplicate(String),

    #[error("Idea not found in favorites: {0}")]
    NotFound(String),

    #[error("Cannot save more than {max} favorites")]
    Capacity { max: usize },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        StoreError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
