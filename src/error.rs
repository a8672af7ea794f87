use crate::wire::{Opcode, Status};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unimplemented request: opcode {opcode}")]
    UnimplementedRequest { opcode: u16 },

    #[error("Message too short: need {needed} bytes, have {available}")]
    MessageTooShort { needed: usize, available: usize },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Opcode {0:?} is bound more than once")]
    DuplicateBinding(Opcode),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Remote error: {0:?}")]
    Remote(Status),
}

impl ServiceError {
    /// Status code sent back to the peer when this error ends a request.
    pub fn status(&self) -> Status {
        match self {
            ServiceError::UnimplementedRequest { .. } => {
                Status::UnimplementedRequest
            }
            ServiceError::MessageTooShort { .. } => Status::MessageTooShort,
            ServiceError::MalformedPayload(_) => Status::RequestFormatError,
            ServiceError::DuplicateBinding(_) | ServiceError::Internal(_) => {
                Status::InternalError
            }
            ServiceError::Remote(status) => *status,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
