//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> rejection messages, aggregated across all failing fields.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("settings are frozen")]
    FrozenSettings,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("duplicate resource: {prefix}_{name}")]
    DuplicateResource { prefix: String, name: String },
    #[error("unknown resource: {prefix}_{name}")]
    UnknownResource { prefix: String, name: String },
    #[error("missing primary key '{pk}' on {prefix}_{name}")]
    MissingPrimaryKey { prefix: String, name: String, pk: String },
    #[error("join field '{field}' does not reference {parent}")]
    TypeMismatch { parent: String, field: String },
    #[error("component link {parent} -> {child} closes a cycle")]
    ComponentCycle { parent: String, child: String },
    #[error("registry is frozen")]
    FrozenRegistry,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Module disabled: {0}")]
    ModuleDisabled(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("unsupported representation: {0}")]
    UnsupportedRepresentation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("transient database failure")]
    Transient,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::UnknownResource { prefix, name } => {
                ApiError::UnknownResource(format!("{}_{}", prefix, name))
            }
            other => ApiError::Fatal(other.to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, details) = match &self {
            ApiError::ModuleDisabled(_) => (StatusCode::NOT_FOUND, "module_disabled", None),
            ApiError::UnknownResource(_) => (StatusCode::NOT_FOUND, "unknown_resource", None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", None),
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                Some(serde_json::to_value(fields).unwrap_or_default()),
            ),
            ApiError::UnsupportedRepresentation(_) => {
                (StatusCode::NOT_ACCEPTABLE, "unsupported_representation", None)
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", None),
            ApiError::Transient => (StatusCode::SERVICE_UNAVAILABLE, "transient_failure", None),
            ApiError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found", None)
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
                }
            }
            ApiError::Fatal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None),
        };
        // Fatal detail stays in the log, never in the client body.
        let message = match &self {
            ApiError::Fatal(detail) => {
                tracing::error!(detail = %detail, "fatal error");
                "internal error".to_string()
            }
            ApiError::Db(e) if !matches!(e, sqlx::Error::RowNotFound) => {
                tracing::error!(error = %e, "database error");
                "database error".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
