//! Ports and Adapters Infrastructure
//!
//! Shared error and marker types for the hexagonal boundary. The claims
//! domain defines its own port traits on top of these; adapters (PostgreSQL,
//! in-memory mock) implement them.
//!
//! ```text
//!        ClaimLifecycleService
//!                 │
//!                 ▼
//!   ClaimsPort / ClaimEventPublisher      (domain_claims)
//!          ▲                 ▲
//!          │                 │
//!  PostgresClaimsAdapter   MockClaimsPort
//!      (infra_db)          (feature "mock")
//! ```

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorCategory, ErrorKey};

/// Error type for port operations
///
/// All port implementations report failures through this type so the
/// service layer does not depend on the adapter's storage technology.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested entity was not found
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// Stored or supplied data failed validation
    #[error("Validation error: {message}")]
    Validation {
        message: String,
    },

    /// The write lost an optimistic concurrency race or hit a uniqueness rule
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
    },

    /// Connection to the underlying system failed
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation timed out
    #[error("Timeout after {duration_ms}ms: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
    },

    /// A row could not be mapped to a domain value
    #[error("Transformation error: {message}")]
    Transformation {
        message: String,
    },

    /// An internal error occurred
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PortError {
    /// Creates a NotFound error
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        PortError::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        PortError::Connection {
            message: message.into(),
            source: None,
        }
    }

    pub fn transformation(message: impl Into<String>) -> Self {
        PortError::Transformation {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        PortError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error indicates a transient failure that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Connection { .. } | PortError::Timeout { .. }
        )
    }

    /// Returns true if this error indicates the entity was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

impl From<PortError> for AppError {
    fn from(err: PortError) -> Self {
        let message = err.to_string();
        match err {
            PortError::NotFound { .. } => AppError::not_found(ErrorKey::NotFound, message),
            PortError::Validation { .. } => AppError::validation(message),
            PortError::Conflict { .. } => AppError::new(ErrorCategory::Conflict, ErrorKey::Conflict, message),
            PortError::Transformation { .. } => AppError::database(ErrorKey::QueryFailure, message),
            PortError::Connection { .. } | PortError::Timeout { .. } => {
                AppError::database(ErrorKey::QueryFailure, message)
            }
            PortError::Internal { .. } => AppError::internal(message),
        }
    }
}

/// Marker trait for all domain ports
///
/// All port traits should extend this marker to ensure they are
/// thread-safe and can be used in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    Unhealthy,
}

/// Health check result for an adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

impl HealthCheckResult {
    pub fn healthy(adapter_id: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: chrono::Utc::now(),
        }
    }

    pub fn unhealthy(adapter_id: impl Into<String>, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(message.into()),
            checked_at: chrono::Utc::now(),
        }
    }
}

/// Trait for adapters that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Performs a health check on the adapter
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_error_not_found() {
        let error = PortError::not_found("Claim", "123");
        assert!(error.is_not_found());
        assert!(!error.is_transient());
        assert!(error.to_string().contains("Claim"));
        assert!(error.to_string().contains("123"));
    }

    #[test]
    fn test_port_error_transient() {
        let timeout = PortError::Timeout {
            operation: "load_claim".to_string(),
            duration_ms: 5000,
        };
        assert!(timeout.is_transient());

        let validation = PortError::validation("bad status");
        assert!(!validation.is_transient());
    }

    #[test]
    fn test_port_error_into_app_error() {
        let conflict: AppError = PortError::conflict("version mismatch").into();
        assert_eq!(conflict.category, ErrorCategory::Conflict);
        assert_eq!(conflict.key, ErrorKey::Conflict);

        let missing: AppError = PortError::not_found("Claim", "abc").into();
        assert_eq!(missing.category, ErrorCategory::NotFound);

        let broken: AppError = PortError::connection("refused").into();
        assert_eq!(broken.category, ErrorCategory::Database);
    }

    #[test]
    fn test_health_check_result() {
        let result = HealthCheckResult::unhealthy("postgres", 12, "down");
        assert_eq!(result.status, AdapterHealth::Unhealthy);
        assert_eq!(result.message.as_deref(), Some("down"));
    }
}
