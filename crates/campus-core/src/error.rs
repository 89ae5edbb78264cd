//! Unified error types for all layers of the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::Debug;
use thiserror::Error;

/// Unified error type for Campus.
///
/// Every failure the API can report is one variant of this enum. The HTTP
/// status, the machine-readable code and the optional structured details
/// are derived from the variant, so the response boundary matches on it
/// explicitly instead of inspecting a type hierarchy.
#[derive(Error, Debug)]
pub enum CampusError {
    // ============ Persistence Errors ============
    /// Generic database error
    #[error("Database error: {0}")]
    Database(String),

    /// Could not reach the database
    #[error("Failed to connect to database: {0}")]
    DatabaseConnection(String),

    /// A query was rejected or failed
    #[error("Database query failed: {0}")]
    DatabaseQuery(String),

    // ============ Cache Errors ============
    /// Generic cache error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Could not reach the key-value store
    #[error("Failed to connect to cache: {0}")]
    CacheConnection(String),

    /// A key-value store command failed
    #[error("Cache operation failed: {0}")]
    CacheOperation(String),

    // ============ Client Errors ============
    /// Validation error with optional field-level details
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    /// Missing or invalid credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated but not permitted
    #[error("Forbidden: {0}")]
    Authorization(String),

    /// Too many requests inside the current window
    #[error("Too many requests")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Resource not found
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Conflict error (e.g., duplicate entry)
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ Infrastructure Errors ============
    /// External service error
    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    /// A dependency is temporarily unavailable
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CampusError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Authentication(_) => 401,
            Self::Authorization(_) => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::RateLimitExceeded { .. } => 429,
            Self::ExternalService { .. } => 502,
            Self::ServiceUnavailable(_) | Self::Timeout(_) => 503,
            Self::Database(_)
            | Self::DatabaseConnection(_)
            | Self::DatabaseQuery(_)
            | Self::Cache(_)
            | Self::CacheConnection(_)
            | Self::CacheOperation(_)
            | Self::Configuration(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::DatabaseConnection(_) => "DATABASE_CONNECTION_ERROR",
            Self::DatabaseQuery(_) => "DATABASE_QUERY_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::CacheConnection(_) => "CACHE_CONNECTION_ERROR",
            Self::CacheOperation(_) => "CACHE_OPERATION_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Authentication(_) => "AUTHENTICATION_ERROR",
            Self::Authorization(_) => "AUTHORIZATION_ERROR",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::NotFound { .. } => "RESOURCE_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT_ERROR",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Returns structured details for the response body, if the variant has any.
    #[must_use]
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Validation { details, .. } => details.clone(),
            Self::RateLimitExceeded { retry_after_secs } => {
                Some(json!({ "retryAfter": retry_after_secs }))
            }
            Self::NotFound { resource_type, id } => {
                Some(json!({ "resource": resource_type, "id": id }))
            }
            Self::ExternalService { service, .. } => Some(json!({ "service": service })),
            _ => None,
        }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a validation error without details.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Creates a validation error carrying field-level details.
    #[must_use]
    pub fn validation_with_details<T: Into<String>>(message: T, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication<T: Into<String>>(message: T) -> Self {
        Self::Authentication(message.into())
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization<T: Into<String>>(message: T) -> Self {
        Self::Authorization(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::DatabaseConnection(_)
                | Self::Cache(_)
                | Self::CacheConnection(_)
                | Self::CacheOperation(_)
                | Self::ExternalService { .. }
                | Self::ServiceUnavailable(_)
                | Self::Timeout(_)
        )
    }
}

impl From<serde_json::Error> for CampusError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON serialization error: {}", err))
    }
}

/// Serializable error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Machine-readable error code
    pub error_code: String,
    /// Human-readable error message
    pub message: String,
    /// Structured details, `null` when the error has none
    pub details: Option<Value>,
    /// Request path that produced the error
    pub path: String,
    /// When the error was produced
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    /// Builds the response body for `error` raised while serving `path`.
    #[must_use]
    pub fn from_error(error: &CampusError, path: impl Into<String>) -> Self {
        Self {
            status_code: error.status_code(),
            error_code: error.error_code().to_string(),
            message: error.to_string(),
            details: error.details(),
            path: path.into(),
            timestamp: Utc::now(),
        }
    }
}
