use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Main error type for the ACL sync service
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration or CLI argument errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Membership could not be listed, or the roster looked inconsistent
    #[error("Membership unavailable: {0}")]
    MembershipUnavailable(String),

    /// A read against the ACL backend failed
    #[error("ACL read failed: {0}")]
    AclRead(String),

    /// An add or remove against the ACL backend failed
    #[error("ACL mutation failed: {0}")]
    AclMutation(String),

    /// A pass ran to the end but some ports could not be reconciled
    #[error("Reconciliation pass incomplete: {} failure(s)", .failures.len())]
    PassIncomplete {
        mutation_occurred: bool,
        failures: Vec<PassFailure>,
    },

    /// Node role could not be determined
    #[error("Role classification failed: {0}")]
    Role(String),

    /// Scheduler job errors (stopped, dropped replies)
    #[error("Job error: {0}")]
    Job(String),

    /// System I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Which step of a pass a failure came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStage {
    Prune,
    Read,
    Add,
    Remove,
}

impl std::fmt::Display for PassStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassStage::Prune => write!(f, "prune"),
            PassStage::Read => write!(f, "read"),
            PassStage::Add => write!(f, "add"),
            PassStage::Remove => write!(f, "remove"),
        }
    }
}

/// One failed backend call inside a pass.
/// `port` is `None` when the failure was not tied to a single port (listing all entries).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PassFailure {
    pub port: Option<u16>,
    pub stage: PassStage,
    pub message: String,
}

impl PassFailure {
    pub fn new(port: Option<u16>, stage: PassStage, err: &SyncError) -> Self {
        Self {
            port,
            stage,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for PassFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{} on port {}: {}", self.stage, port, self.message),
            None => write!(f, "{}: {}", self.stage, self.message),
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            SyncError::Config(_) => StatusCode::BAD_REQUEST,
            SyncError::MembershipUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::AclRead(_) => StatusCode::BAD_GATEWAY,
            SyncError::AclMutation(_) => StatusCode::BAD_GATEWAY,
            SyncError::PassIncomplete { .. } => StatusCode::BAD_GATEWAY,
            SyncError::Role(_) => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::Job(_) => StatusCode::SERVICE_UNAVAILABLE,
            SyncError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SyncError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SyncError::Http(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            SyncError::Config(_) => "configuration_error",
            SyncError::MembershipUnavailable(_) => "membership_unavailable",
            SyncError::AclRead(_) => "acl_read_failed",
            SyncError::AclMutation(_) => "acl_mutation_failed",
            SyncError::PassIncomplete { .. } => "pass_incomplete",
            SyncError::Role(_) => "role_error",
            SyncError::Job(_) => "job_error",
            SyncError::Io(_) => "io_error",
            SyncError::Serialization(_) => "serialization_error",
            SyncError::Http(_) => "http_error",
        }
    }

    /// Whether this error came from a backend call that the next scheduled pass will retry
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SyncError::Config(_))
    }
}

// Axum IntoResponse implementation for HTTP error responses
impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let failures = match &self {
            SyncError::PassIncomplete { failures, .. } => failures.clone(),
            _ => Vec::new(),
        };

        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
                "failures": failures,
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::SyncError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SyncError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! membership_error {
    ($msg:expr) => {
        $crate::error::SyncError::MembershipUnavailable($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SyncError::MembershipUnavailable(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! acl_read_error {
    ($msg:expr) => {
        $crate::error::SyncError::AclRead($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SyncError::AclRead(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! acl_mutation_error {
    ($msg:expr) => {
        $crate::error::SyncError::AclMutation($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::SyncError::AclMutation(format!($fmt, $($arg)*))
    };
}
