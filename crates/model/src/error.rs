//! Model error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// An instance id must contain at least one character
    #[error("instance id must not be empty")]
    EmptyInstanceId,
}

pub type Result<T> = std::result::Result<T, ModelError>;
