//! Error handling for the query compiler.
//!
//! The compiler is deliberately permissive about filter payloads — garbage in
//! a bookmarked query string must never produce a 500 — so the only errors it
//! raises are setup problems: a malformed route-level blacklist, a missing
//! required identifier, or a route that names an entity nobody registered.
//! Internal details are logged with `tracing` before a sanitized JSON body is
//! sent to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

/// Compiler error with automatic logging and a sanitized response body.
#[derive(Debug)]
pub enum ApiError {
    /// 500 Internal Server Error - a caller-supplied override is malformed
    Configuration {
        /// Description of the malformed option
        message: String,
    },

    /// 400 Bad Request - a single-record operation found no identifier
    MissingIdentifier,

    /// 500 Internal Server Error - no entity matches the requested name
    UnknownEntity {
        /// The name that failed to resolve
        name: String,
    },
}

impl ApiError {
    /// Create a configuration error for a malformed route option.
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ApiError::configuration("Invalid criteria blacklist"));
    /// ```
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create the 400 error for a missing record identifier.
    #[must_use]
    pub const fn missing_identifier() -> Self {
        Self::MissingIdentifier
    }

    /// Create the error for an entity name no schema was registered under.
    pub fn unknown_entity(name: impl Into<String>) -> Self {
        Self::UnknownEntity { name: name.into() }
    }

    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration { .. } | Self::UnknownEntity { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::MissingIdentifier => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the user-facing error message (sanitized)
    fn user_message(&self) -> String {
        match self {
            Self::Configuration { message } => message.clone(),
            Self::MissingIdentifier => {
                "No `id` parameter provided. Even if the entity's primary key is not named \
                 `id`, `id` should be used as the name of the parameter; it is mapped to the \
                 proper primary key name."
                    .to_string()
            }
            Self::UnknownEntity { name } => {
                format!("I don't know about any entities named `{name}`")
            }
        }
    }

    /// Log error details before the response is built.
    fn log_internal(&self) {
        match self {
            Self::Configuration { message } => {
                tracing::error!(message = %message, "Invalid request setup");
            }
            Self::UnknownEntity { name } => {
                tracing::error!(entity = %name, "Unknown entity requested");
            }
            Self::MissingIdentifier => {
                tracing::debug!(
                    status = %self.status_code(),
                    "Request rejected: no record identifier"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    /// Error message
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let response = ErrorResponse {
            error: self.user_message(),
        };

        (status, Json(response)).into_response()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_is_500() {
        let err = ApiError::configuration("Invalid criteria blacklist");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Invalid criteria blacklist");
    }

    #[test]
    fn test_missing_identifier_is_400_with_id_guidance() {
        let err = ApiError::missing_identifier();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.user_message().contains("`id` should be used"));
    }

    #[test]
    fn test_unknown_entity_names_the_entity() {
        let err = ApiError::unknown_entity("wombat");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.user_message().contains("`wombat`"));
    }

    #[test]
    fn test_display_trait() {
        let err = ApiError::configuration("Test error");
        assert_eq!(format!("{err}"), "Test error");
    }

    #[test]
    fn test_error_trait() {
        let err = ApiError::missing_identifier();
        let _: &dyn std::error::Error = &err;
    }
}
