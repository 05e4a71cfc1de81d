//! Error types for the Terraform operator

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for operator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error not covered by a more specific variant
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// A referenced object does not exist in the resource store
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Sub-kind of the missing object
        kind: String,
        /// Namespace that was searched
        namespace: String,
        /// Name of the missing object
        name: String,
    },

    /// Deletion requested while a live dependent still references the object
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Optimistic concurrency conflict on write
    #[error("conflict: {0}")]
    Conflict(String),

    /// Filesystem failure in the configuration directory
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// Path being written or removed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Spec content could not be encoded into a configuration document
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Declared dependencies are invalid (kind mismatch, self-loop, cycle)
    #[error("validation error: {0}")]
    Validation(String),

    /// Startup readiness probe never succeeded
    #[error("preflight check failed: {0}")]
    Preflight(String),

    /// The external provisioning tool exited unsuccessfully
    #[error("terraform error: {0}")]
    Terraform(String),
}

impl Error {
    /// Create a not-found error for the given object
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a precondition error with the given message
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a conflict error with the given message
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create an I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an encoding error with the given message
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a preflight error with the given message
    pub fn preflight(msg: impl Into<String>) -> Self {
        Self::Preflight(msg.into())
    }

    /// Create a terraform error with the given message
    pub fn terraform(msg: impl Into<String>) -> Self {
        Self::Terraform(msg.into())
    }

    /// Returns true if the error means the object is absent
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Kube(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }

    /// Returns true if the host loop should retry with its standard backoff
    ///
    /// Encoding and validation failures need a code or spec change first.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Encoding(_) | Self::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}
