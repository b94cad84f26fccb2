use thiserror::Error;

use crate::service::ResourceKind;

/// Failure talking to one of the remote collaborators (search service or blob storage).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode service response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request signing failed: {0}")]
    Signing(String),
}

impl ServiceError {
    pub fn status(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        ServiceError::Status {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("missing configuration options: {}", .0.join(", "))]
    Config(Vec<String>),

    #[error("input error: {0}")]
    Input(String),

    #[error("unknown skill kind: {0}")]
    UnknownSkill(String),

    #[error("skill {skill} cannot run: {message}")]
    Skill {
        skill: String,
        message: String,
    },

    #[error("failed to upload test input: {0}")]
    Upload(#[source] ServiceError),

    #[error("failed to provision {kind} '{name}': {source}")]
    Provisioning {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ServiceError,
    },

    #[error("search service error: {0}")]
    Service(#[from] ServiceError),

    #[error("skill test worker stopped before finishing: {0}")]
    Cancelled(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
