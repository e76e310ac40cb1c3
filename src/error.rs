//! Error types for module loading
//!
//! This module provides structured error types using thiserror. Parse
//! failures are deliberately absent: the syntax tree adapter absorbs them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a [`ModuleFetcher`](crate::fetch::ModuleFetcher)
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Module not found at '{path}'")]
    NotFound { path: String },

    #[error("Failed to read module file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any failure reported by a host-provided fetcher
    #[error("Host fetch failed: {reason}")]
    Host { reason: String },
}

impl FetchError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn host(reason: impl Into<String>) -> Self {
        Self::Host {
            reason: reason.into(),
        }
    }

    /// Stable code for programmatic handling
    pub fn status_code(&self) -> String {
        match self {
            Self::NotFound { .. } => "MODULE_NOT_FOUND",
            Self::Io { .. } => "MODULE_READ_ERROR",
            Self::Host { .. } => "HOST_FETCH_ERROR",
        }
        .to_string()
    }

    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::NotFound { .. } => vec!["Check that the module exists under the fetcher's root"],
            Self::Io { .. } => vec!["Check that the file is readable"],
            Self::Host { .. } => vec!["Check the host fetcher's connectivity and logs"],
        }
    }
}

/// Errors surfaced by the dependency loader
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to fetch module '{specifier}' (resolved to '{identifier}'): {source}")]
    FetchFailed {
        specifier: String,
        identifier: String,
        #[source]
        source: FetchError,
    },
}

impl LoadError {
    /// Identifier whose fetch failed
    pub fn identifier(&self) -> &str {
        match self {
            Self::FetchFailed { identifier, .. } => identifier,
        }
    }

    pub fn status_code(&self) -> String {
        match self {
            Self::FetchFailed { source, .. } => source.status_code(),
        }
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::FetchFailed {
                source: FetchError::NotFound { .. },
                ..
            } => vec![
                "Check the import specifier for typos",
                "Make sure the package is installed under the dependency root",
            ],
            Self::FetchFailed {
                source: FetchError::Io { .. },
                ..
            } => vec![
                "Check that the file exists and you have read permissions",
                "Ensure the file is not locked by another process",
            ],
            Self::FetchFailed {
                source: FetchError::Host { .. },
                ..
            } => vec![
                "The failed module is marked as errored; load the importing file again to retry",
            ],
        }
    }
}

/// Errors from the language service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Language service unavailable: {reason}")]
    Unavailable { reason: String },
}

impl ServiceError {
    pub fn status_code(&self) -> String {
        match self {
            Self::Unavailable { .. } => "SERVICE_UNAVAILABLE",
        }
        .to_string()
    }

    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Unavailable { .. } => vec![
                "Restart the language service worker",
                "Validate again once the service is back",
            ],
        }
    }
}

/// Errors returned by plugin validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error(
        "Buffer '{identifier}' has {} syntactic and {} semantic diagnostics",
        .diagnostics.syntactic.len(),
        .diagnostics.semantic.len()
    )]
    Rejected {
        identifier: String,
        diagnostics: crate::service::Diagnostics,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ValidationError {
    pub fn status_code(&self) -> String {
        match self {
            Self::Rejected { .. } => "DIAGNOSTICS_REPORTED".to_string(),
            Self::Service(source) => source.status_code(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Rejected { .. } => vec!["Fix the reported diagnostics and validate again"],
            Self::Service(source) => source.recovery_suggestions(),
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;
pub type FetchResult<T> = Result<T, FetchError>;
