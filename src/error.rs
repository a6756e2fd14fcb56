//! Error handling for zone classification operations.
//!
//! Covers upstream collaborators that are not ready, malformed payloads that
//! could not be decoded, standard profile writes that only partly succeeded,
//! and invalid user selections.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream data is not ready: {reason}")]
    NotReady { reason: String },

    #[error("Upstream source unavailable: {source_name} - {reason}")]
    UpstreamUnavailable { source_name: String, reason: String },

    #[error("Failed to read payload file: {path} - {reason}")]
    PayloadFile { path: PathBuf, reason: String },

    #[error("No standard profile with id {id}")]
    ProfileNotFound { id: i64 },

    #[error("Reset to default applied {applied} of {total} profiles before failing: {source}")]
    PartialReset {
        applied: usize,
        total: usize,
        #[source]
        source: Box<CropwatchError>,
    },

    #[error("Invalid selection: {message}")]
    InvalidSelection { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl CropwatchError {
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady {
            reason: reason.into(),
        }
    }

    pub fn upstream(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_selection(message: impl Into<String>) -> Self {
        Self::InvalidSelection {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for failures that mean the upstream collaborator could not be used at all
    pub fn is_upstream_failure(&self) -> bool {
        match self {
            Self::NotReady { .. }
            | Self::UpstreamUnavailable { .. }
            | Self::PayloadFile { .. }
            | Self::Io(_) => true,
            #[cfg(feature = "http")]
            Self::Http(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CropwatchError>;
