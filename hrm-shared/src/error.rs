/// Business error taxonomy shared by every service
///
/// Each variant maps to exactly one HTTP status in the API crate:
///
/// | Variant | Status |
/// |---|---|
/// | `Validation` | 400 |
/// | `Conflict` | 400 |
/// | `Capacity` | 400 |
/// | `Unauthorized` | 401 |
/// | `Forbidden` | 403 |
/// | `NotFound` | 404 |
/// | `MemberNotFound` | 404 |
/// | `Store`, `Internal` | 500 |

use crate::auth::authorization::AuthzError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Uniqueness or state violation
    #[error("{0}")]
    Conflict(String),

    /// Team roster is full
    #[error("Team is at maximum capacity")]
    Capacity,

    /// Bad credentials or unusable account
    #[error("{0}")]
    Unauthorized(String),

    /// Actor may not perform the operation
    #[error("{0}")]
    Forbidden(String),

    /// Target resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// User is not on the team's roster
    #[error("User is not a member of this team")]
    MemberNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ServiceError::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ServiceError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ServiceError::Forbidden(msg.into())
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        ServiceError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
