//! Error types surfaced to callers.
//!
//! Only configuration problems are fatal. Placement shortfalls, rule
//! violations, tension overflow and duplicate opens are absorbed where they
//! happen and recorded for diagnostics instead.

use crate::objects::ObjectId;

/// Fatal configuration error: the session must not start
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
    #[error("Malformed bounds: {0}")]
    MalformedBounds(String),
    #[error("Malformed exclusion region #{index}: {reason}")]
    MalformedExclusion { index: usize, reason: String },
    #[error("Invalid area rules for theme {theme}: {reason}")]
    InvalidAreaRules { theme: String, reason: String },
    #[error("Unknown cluster template: {0}")]
    UnknownClusterTemplate(String),
    #[error("Invalid cluster template {id}: {reason}")]
    InvalidClusterTemplate { id: String, reason: String },
    #[error("Invalid engine config: {0}")]
    InvalidEngineConfig(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rejected interaction. Engine state is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InteractionError {
    #[error("Object not found: {0}")]
    UnknownObject(ObjectId),
    #[error("Object {0} is not a container")]
    NotAContainer(ObjectId),
    #[error("Contents of container {container} unavailable: {reason}")]
    ContentsUnavailable { container: ObjectId, reason: String },
}
