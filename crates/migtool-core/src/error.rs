//! Error types and exit codes for migtool.
//!
//! This module provides a unified error type (`MigError`) that bridges
//! the layer-specific errors (graph build, provider, configuration, apply)
//! into a common format suitable for JSON output and process exit codes.
//!
//! ## Exit Code Mapping
//!
//! - `2`: Invalid arguments (bad input from caller, malformed config)
//! - `3`: Blocked (the impact report says the operation cannot proceed)
//! - `4`: Apply errors (failed to write, move or delete files)
//! - `10`: Internal errors (build failures, cancellation, unexpected state)
//!
//! Findings about the solution itself (missing entities, referenced deletes,
//! ambiguous references) are never errors here. They are fields of the
//! [`ImpactReport`](crate::impact::ImpactReport).

use std::fmt;

use thiserror::Error;

use crate::cancel::Cancelled;
use crate::config::ConfigError;
use crate::entity::ProviderError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Stable error codes for JSON output and CLI exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// The impact report blocks the operation (`CanProceed == false`).
    Blocked = 3,
    /// Apply errors (failed to write changes, move or delete files).
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state, aborted builds).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Build Errors
// ============================================================================

/// Fatal errors while building the dependency graph.
///
/// Per-file problems never surface here; they become graph diagnostics.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The entity provider could not enumerate the solution at all.
    #[error("entity provider failed: {0}")]
    Provider(#[from] ProviderError),

    /// The build was cancelled through its cancellation token.
    #[error("graph build cancelled")]
    Cancelled,

    /// The discovery worker pool could not be created.
    #[error("failed to start discovery workers: {message}")]
    WorkerPool { message: String },
}

impl From<Cancelled> for BuildError {
    fn from(_: Cancelled) -> Self {
        BuildError::Cancelled
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum MigError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The analyzed operation cannot proceed.
    #[error("operation blocked: {message}")]
    Blocked { message: String },

    /// Graph construction failed.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to apply changes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&MigError> for OutputErrorCode {
    fn from(err: &MigError) -> Self {
        match err {
            MigError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            MigError::Blocked { .. } => OutputErrorCode::Blocked,
            MigError::Build(BuildError::Provider(ProviderError::RootNotFound { .. })) => {
                OutputErrorCode::InvalidArguments
            }
            MigError::Build(_) => OutputErrorCode::InternalError,
            MigError::Config(_) => OutputErrorCode::InvalidArguments,
            MigError::ApplyError { .. } => OutputErrorCode::ApplyError,
            MigError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<MigError> for OutputErrorCode {
    fn from(err: MigError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl From<std::io::Error> for MigError {
    fn from(err: std::io::Error) -> Self {
        MigError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for MigError {
    fn from(err: serde_json::Error) -> Self {
        MigError::InternalError {
            message: format!("JSON error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl MigError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        MigError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a blocked-operation error.
    pub fn blocked(message: impl Into<String>) -> Self {
        MigError::Blocked {
            message: message.into(),
        }
    }

    /// Create an apply error tied to a file.
    pub fn apply(message: impl Into<String>, file: Option<String>) -> Self {
        MigError::ApplyError {
            message: message.into(),
            file,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        MigError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
