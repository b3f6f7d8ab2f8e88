//! Result type aliases for the user-data service.

use crate::UserApiError;

/// A specialized `Result` type for user-data operations.
pub type UserApiResult<T> = Result<T, UserApiError>;
