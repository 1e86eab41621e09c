use crate::cert::validate::ValidationError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HostCaError {
    #[error("Authentication required: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authority not found: {0}")]
    AuthorityNotFound(String),

    #[error("Certificate already exists for {hostname} in authority {authority}")]
    Conflict { authority: String, hostname: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Certificate parsing error: {0}")]
    CertParsing(String),

    #[error("Certificate not found: {0}")]
    CertNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, HostCaError>;

/// Caller-visible outcome class of an issuance call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Unauthorized,
    BadRequest,
    NotFound,
    Conflict,
    ServerError,
}

impl Outcome {
    /// HTTP-equivalent status code for this outcome
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Created => 201,
            Self::Unauthorized => 401,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::ServerError => 500,
        }
    }
}

impl HostCaError {
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Auth(_) => Outcome::Unauthorized,
            Self::Validation(_) | Self::AuthorityNotFound(_) | Self::InvalidInput(_) => {
                Outcome::BadRequest
            }
            Self::CertNotFound(_) => Outcome::NotFound,
            Self::Conflict { .. } => Outcome::Conflict,
            Self::Signing(_)
            | Self::Storage(_)
            | Self::Config(_)
            | Self::CertParsing(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => Outcome::ServerError,
        }
    }

    /// Structured error payload, `{"error": "..."}`
    pub fn error_body(&self) -> serde_json::Value {
        json!({ "error": self.to_string() })
    }
}
