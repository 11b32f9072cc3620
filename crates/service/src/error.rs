//! Service error types
//!
//! Only NotFound crosses the service boundary as an error; a refused
//! eject is an [`model::EjectResult`] value and an absent property is
//! just an absent field.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The id is absent from the current cache; refresh and retry
    #[error("USB device not found: {instance_id}")]
    NotFound { instance_id: String },
}

impl ServiceError {
    pub(crate) fn not_found(instance_id: &model::DeviceId) -> Self {
        Self::NotFound {
            instance_id: instance_id.as_str().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
