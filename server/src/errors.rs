// server/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront_flow::FlowError;
use thiserror::Error;

use crate::query::QueryError;
use crate::services::payment_gateway::PaymentError;
use crate::store::StoreError;

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

  #[error("Payment Provider Error: {0}")]
  Upstream(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[source] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::Conflict(m) => AppError::Conflict(m),
      StoreError::MissingReference(m) => AppError::NotFound(m),
      other => AppError::Store(other),
    }
  }
}

impl From<QueryError> for AppError {
  fn from(err: QueryError) -> Self {
    AppError::Validation(err.to_string())
  }
}

impl From<PaymentError> for AppError {
  fn from(err: PaymentError) -> Self {
    AppError::Upstream(err.to_string())
  }
}

impl AppError {
  /// Message safe to show a client. Server-side failures keep their detail in the logs only.
  fn public_message(&self) -> String {
    match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m) => m.clone(),
      AppError::Upstream(_) => "Failed to create checkout session".to_string(),
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        "Something went wrong on the server".to_string()
      }
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
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::Config(_) | AppError::Store(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with server error");
    } else {
      tracing::warn!(application_error = %self, "Responding with client error");
    }
    let kind = if status.is_client_error() { "fail" } else { "error" };
    HttpResponse::build(status).json(json!({ "status": kind, "message": self.public_message() }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
