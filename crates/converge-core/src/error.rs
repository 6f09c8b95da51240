//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("Failed to parse YAML manifest: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON manifest: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            message: message.into(),
        }
    }
}

/// Failure to map a free-form name onto a discovered resource type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No discovered type matches the name
    #[error("the server doesn't have a resource type '{name}'")]
    Unknown { name: String },

    /// The name matches types in several groups and no group was given
    #[error("resource type '{name}' is ambiguous, qualify it with a group: {}", candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
