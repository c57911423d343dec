//! # Error Handling for the Query Engine
//!
//! Every failure inside a [`DataTable::make`](crate::DataTable::make) run ends up here:
//! - Compilation problems (bad custom order templates, unknown column indexes)
//! - Execution problems raised by the database driver
//! - Configuration problems that cannot be degraded to a default
//!
//! ## Philosophy
//!
//! **Never expose driver errors to DataTables clients**. The driver error is kept
//! for server-side logging, the client only sees a sanitized message in the
//! response's `error` field.
//!
//! ## Logging
//!
//! Internal details are logged with the `tracing` crate. Nothing is printed
//! unless the application installs a subscriber:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt().with_target(false).compact().init();
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

/// Errors raised while compiling or executing a DataTables query.
#[derive(Debug)]
pub enum DataTableError {
    /// A custom order template or column reference could not be compiled.
    QueryCompilation {
        /// User-facing error message
        message: String,
    },

    /// The driver failed while counting or fetching (details logged, not exposed)
    Execution {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to the client)
        internal: DbErr,
    },

    /// Configuration that could not be degraded to a usable default.
    Configuration {
        /// User-facing error message
        message: String,
    },
}

impl DataTableError {
    /// Create a compilation error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(DataTableError::compilation("order template for `rank` expects 2 bindings"));
    /// ```
    pub fn compilation(message: impl Into<String>) -> Self {
        Self::QueryCompilation {
            message: message.into(),
        }
    }

    /// Create an execution error from a driver error
    ///
    /// The driver error is logged but NOT sent to the client.
    pub fn execution(err: DbErr) -> Self {
        Self::Execution {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::QueryCompilation { .. } => StatusCode::BAD_REQUEST,
            Self::Execution { .. } | Self::Configuration { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// User-facing error message (sanitized)
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::QueryCompilation { message }
            | Self::Execution { message, .. }
            | Self::Configuration { message } => message.clone(),
        }
    }

    /// Message including internal details, only used when debugging is enabled
    #[must_use]
    pub fn debug_message(&self) -> String {
        match self {
            Self::Execution { internal, .. } => internal.to_string(),
            _ => self.user_message(),
        }
    }

    /// Log internal error details (not sent to the client)
    pub fn log_internal(&self) {
        match self {
            Self::Execution { internal, .. } => {
                tracing::error!(error = ?internal, "DataTables query execution failed");
            }
            Self::QueryCompilation { message } => {
                tracing::warn!(details = %message, "DataTables query compilation failed");
            }
            Self::Configuration { message } => {
                tracing::error!(details = %message, "DataTables configuration error");
            }
        }
    }
}

/// Error body for callers that surface `try_make` errors directly over HTTP
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for DataTableError {
    fn into_response(self) -> Response {
        self.log_internal();
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl fmt::Display for DataTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for DataTableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Execution { internal, .. } => Some(internal),
            _ => None,
        }
    }
}

/// Every driver error raised during a run is an execution error.
impl From<DbErr> for DataTableError {
    fn from(err: DbErr) -> Self {
        Self::execution(err)
    }
}
