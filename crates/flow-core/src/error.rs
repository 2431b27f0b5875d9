//! Error taxonomy shared by every flowgraph crate.

use thiserror::Error;

/// What kind of entity a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Edge,
    Flow,
    Technique,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityKind::Node => "node",
            EntityKind::Edge => "edge",
            EntityKind::Flow => "flow",
            EntityKind::Technique => "technique",
        })
    }
}

/// Errors surfaced by edit operations, documents, sharing and persistence.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("cannot connect '{source_id}' to '{target_id}': {reason}")]
    InvalidEdge {
        source_id: String,
        target_id: String,
        reason: String,
    },

    #[error("no shared content for code '{0}'")]
    ShareCodeNotFound(String),

    #[error("shared content is a '{found}', expected a '{expected}'")]
    WrongContentType { expected: String, found: String },

    #[error("storage failure: {0}")]
    Persistence(String),

    #[error("invalid flow document: {0}")]
    InvalidDocument(String),
}

impl FlowError {
    pub fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        FlowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_edge(source: impl ToString, target: impl ToString, reason: &str) -> Self {
        FlowError::InvalidEdge {
            source_id: source.to_string(),
            target_id: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the user can reasonably retry (re-enter a code, press retry on save).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FlowError::ShareCodeNotFound(_) | FlowError::Persistence(_)
        )
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(e: serde_json::Error) -> Self {
        FlowError::InvalidDocument(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for FlowError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        FlowError::InvalidDocument(e.to_string())
    }
}

impl From<rmp_serde::encode::Error> for FlowError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        FlowError::InvalidDocument(e.to_string())
    }
}
