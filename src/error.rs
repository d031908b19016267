//! Error types for agentpack
//!
//! All modules use `PackResult<T>` as their return type. The package loader
//! is the only place these errors are folded into a `None` result.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for agentpack operations
pub type PackResult<T> = Result<T, PackError>;

/// All errors that can occur in agentpack
#[derive(Error, Debug)]
pub enum PackError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Package resolution errors
    #[error("Invalid package id '{id}': {reason}")]
    InvalidPackageId { id: String, reason: String },

    #[error("Package not found: {0}")]
    PackageNotFound(String),

    #[error("Package registry error: {0}")]
    Registry(String),

    // Remote fetch errors
    #[error("HTTP {status} fetching bundle from {url}")]
    FetchStatus { status: u16, url: String },

    #[error("Failed to fetch bundle from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Bundle too large: {size} bytes (max: {max})")]
    BundleTooLarge { size: u64, max: u64 },

    #[error("Unsupported bundle URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    // Materialization errors
    #[error("Invalid bundle for package {id}: {reason}")]
    InvalidBundle { id: String, reason: String },

    #[error("No package factory registered for kind '{0}'")]
    UnknownPackageKind(String),

    // Disk cache errors
    #[error("Disk cache disabled: {0}")]
    DiskCacheDisabled(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid bundle error
    pub fn invalid_bundle(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBundle {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound(_) => {
                Some("Check the package registry file, or run: agentpack builtins")
            }
            Self::ConfigInvalid { .. } => Some("Run: agentpack config show"),
            Self::UnsupportedScheme(_) => Some("Bundle URLs must use http://, https:// or file://"),
            Self::DiskCacheDisabled(_) => Some("Check permissions on the [disk] dir setting"),
            _ => None,
        }
    }
}
