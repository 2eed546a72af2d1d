//! Typed error handling for relate-rs
//!
//! Every failure that can reach an HTTP client is a [`RelateError`]. Each
//! variant wraps a category enum that knows its own status code and
//! machine-readable error code, so handlers only ever propagate with `?`.
//!
//! # Error Categories
//!
//! - [`EntityError`]: lookups, writes and constraint violations on records
//! - [`LinkError`]: many-to-many link maintenance
//! - [`RequestError`]: malformed path segments and bodies
//! - [`StorageError`]: store failures unrelated to the caller's input
//!
//! # Example
//!
//! ```rust,ignore
//! match manager.find_user_with_profile(7).await {
//!     Ok(user) => println!("{:?}", user),
//!     Err(RelateError::Entity(EntityError::NotFound { entity, id })) => {
//!         println!("no {} with id {}", entity, id);
//!     }
//!     Err(e) => eprintln!("other error: {}", e),
//! }
//! ```

use crate::core::schema::EntityKind;
use crate::core::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// The main error type
#[derive(Debug, Error)]
pub enum RelateError {
    #[error(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Error body sent to HTTP clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Error code for programmatic handling
    pub code: &'static str,
}

impl RelateError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelateError::Entity(e) => e.status_code(),
            RelateError::Link(e) => e.status_code(),
            RelateError::Request(e) => e.status_code(),
            RelateError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RelateError::Entity(e) => e.error_code(),
            RelateError::Link(e) => e.error_code(),
            RelateError::Request(e) => e.error_code(),
            RelateError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            code: self.error_code(),
        }
    }

    /// Report a missing entity as invalid input
    ///
    /// Creation routes answer 400 for every failure, including a parent
    /// that does not exist; the message is kept.
    pub fn into_validation(self) -> Self {
        match self {
            RelateError::Entity(EntityError::NotFound { entity, .. })
            | RelateError::Entity(EntityError::InUse { entity, .. }) => {
                let message = self.to_string();
                EntityError::ValidationFailed { entity, message }.into()
            }
            RelateError::Link(LinkError::NotFound { .. }) => {
                let message = self.to_string();
                EntityError::ValidationFailed {
                    entity: EntityKind::Post,
                    message,
                }
                .into()
            }
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RelateError::Entity(EntityError::NotFound { .. })
                | RelateError::Link(LinkError::NotFound { .. })
        )
    }
}

impl IntoResponse for RelateError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else if status != StatusCode::NOT_FOUND {
            tracing::warn!(error = %self, code = self.error_code(), "request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity operations
#[derive(Debug, Error)]
pub enum EntityError {
    /// Lookup, update or delete target does not exist
    #[error("{entity} not found")]
    NotFound { entity: EntityKind, id: i64 },

    /// A write broke a constraint or carried malformed input
    #[error("{message}")]
    ValidationFailed { entity: EntityKind, message: String },

    /// Delete refused while dependents still reference the row
    #[error("{entity} {id} is still referenced by {dependent}")]
    InUse {
        entity: EntityKind,
        id: i64,
        dependent: String,
    },
}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } => StatusCode::NOT_FOUND,
            EntityError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            EntityError::InUse { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::ValidationFailed { .. } => "VALIDATION_FAILED",
            EntityError::InUse { .. } => "ENTITY_IN_USE",
        }
    }
}

// =============================================================================
// Link Errors
// =============================================================================

/// Errors related to post/category links
#[derive(Debug, Error)]
pub enum LinkError {
    /// One endpoint of the pair does not exist
    #[error("Post or category not found")]
    NotFound { post_id: i64, category_id: i64 },
}

impl LinkError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LinkError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LinkError::NotFound { .. } => "LINK_NOT_FOUND",
        }
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors related to the shape of an HTTP request
#[derive(Debug, Error)]
pub enum RequestError {
    /// A path segment is not a valid integer id
    #[error("Invalid id in path: {message}")]
    InvalidId { message: String },

    /// The JSON body could not be parsed into the expected shape
    #[error("Invalid request body: {message}")]
    InvalidBody { message: String },
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidId { .. } => "INVALID_ID",
            RequestError::InvalidBody { .. } => "INVALID_BODY",
        }
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Store failures that are not the caller's fault
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage error: {message}")]
    Backend { message: String },

    #[error("Corrupt {entity} record: {message}")]
    Decode { entity: EntityKind, message: String },
}

// =============================================================================
// Conversions from store errors
// =============================================================================

impl From<StoreError> for RelateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => EntityError::NotFound { entity: kind, id }.into(),
            StoreError::Restricted {
                kind,
                id,
                dependent,
            } => EntityError::InUse {
                entity: kind,
                id,
                dependent,
            }
            .into(),
            StoreError::UniqueViolation { kind, .. }
            | StoreError::ForeignKeyViolation { kind, .. }
            | StoreError::UnknownField { kind, .. }
            | StoreError::MissingField { kind, .. }
            | StoreError::InvalidField { kind, .. }
            | StoreError::InvalidKey { kind, .. } => EntityError::ValidationFailed {
                entity: kind,
                message: err.to_string(),
            }
            .into(),
            StoreError::Decode { kind, message } => StorageError::Decode {
                entity: kind,
                message,
            }
            .into(),
            StoreError::Backend(message) => StorageError::Backend { message }.into(),
        }
    }
}

/// A specialized Result type for relate-rs operations
pub type RelateResult<T> = Result<T, RelateError>;
