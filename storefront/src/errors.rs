// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront_flow::FlowError;
use thiserror::Error;

use crate::repositories::StoreError;
use crate::services::cart::CartError;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  /// A database constraint rejected the write.
  #[error("Integrity Error: {0}")]
  Integrity(String),

  #[error(transparent)]
  Cart(#[from] CartError),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[source] sqlx::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),

  #[error("Pipeline execution was halted by a handler.")]
  PipelineHaltedByHandler,
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound(what) => AppError::NotFound(what),
      StoreError::AlreadyExists(what) => AppError::Validation(format!("{} already exists.", what)),
      StoreError::InvalidReference => AppError::Validation("Referenced resource does not exist.".to_string()),
      StoreError::MissingRequiredData => AppError::Validation("Missing required data.".to_string()),
      StoreError::Integrity(constraint) => AppError::Integrity(constraint),
      StoreError::AlreadyCompleted => AppError::Conflict("Order is already completed.".to_string()),
      StoreError::Sql(e) => AppError::Sqlx(e),
    }
  }
}

impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    StoreError::from(err).into()
  }
}

impl AppError {
  /// Client-facing message; internals stay in the logs.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m) => m.clone(),
      AppError::Integrity(_) => "The change conflicts with stored data.".to_string(),
      AppError::Cart(e) => e.to_string(),
      AppError::Config(_) => "Configuration issue".to_string(),
      AppError::Sqlx(_) => "Database operation failed".to_string(),
      AppError::Workflow { .. } => "Workflow processing error".to_string(),
      AppError::Internal(_) => "An internal error occurred".to_string(),
      AppError::PipelineHaltedByHandler => "Process halted by business logic.".to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) | AppError::Integrity(_) | AppError::PipelineHaltedByHandler => StatusCode::CONFLICT,
      AppError::Cart(CartError::EmptyCart) => StatusCode::CONFLICT,
      AppError::Cart(CartError::Closed) => StatusCode::UNAUTHORIZED,
      AppError::Cart(_) => StatusCode::BAD_REQUEST,
      AppError::Config(_) | AppError::Sqlx(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::info!(application_error = %self, status = status.as_u16(), "Responding with client error");
    }
    HttpResponse::build(status).json(json!({ "error": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
