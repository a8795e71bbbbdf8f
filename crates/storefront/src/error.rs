//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Route handlers return `Result<T, AppError>`;
//! checkout and admin forms handle their own recoverable errors by
//! re-rendering the form instead.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::filters;
use crate::services::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Object storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Session(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Page shown for unknown URLs and server errors.
#[derive(Template, WebTemplate)]
#[template(path = "store/not_found.html")]
pub struct ErrorPageTemplate {
    pub title: &'static str,
    pub message: String,
}

impl ErrorPageTemplate {
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found",
            message: "The page you are looking for was not found.".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let page = match &self {
            Self::NotFound(_) | Self::Database(RepositoryError::NotFound) => {
                ErrorPageTemplate::not_found()
            }
            Self::BadRequest(message) => ErrorPageTemplate {
                title: "Bad Request",
                message: message.clone(),
            },
            Self::Database(RepositoryError::Conflict(message)) => ErrorPageTemplate {
                title: "Conflict",
                message: message.clone(),
            },
            Self::Storage(_) => ErrorPageTemplate {
                title: "Upload Failed",
                message: "An external service failed. Please try again.".to_string(),
            },
            _ => ErrorPageTemplate {
                title: "Server Error",
                message: "Something went wrong. Please try again.".to_string(),
            },
        };

        (status, page).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for shopper and admin actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
