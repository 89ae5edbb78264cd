//! Result type aliases for Campus.

use crate::CampusError;

/// A specialized `Result` type for Campus operations.
pub type CampusResult<T> = Result<T, CampusError>;
