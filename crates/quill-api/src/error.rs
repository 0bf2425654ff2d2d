//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is answered with a status code and a short `text/plain`
//! body.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use quill_core::Error as CoreError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error(transparent)]
  Core(#[from] CoreError),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let core = match self {
      ApiError::NotFound(m) => return (StatusCode::NOT_FOUND, m).into_response(),
      ApiError::Core(e) => e,
    };

    let message = core.to_string();
    match core {
      CoreError::InvalidAdventureType
      | CoreError::AdventureConcluded(_)
      | CoreError::ChoiceRequired(_) => (StatusCode::BAD_REQUEST, message).into_response(),

      CoreError::AdventureNotFound(_) | CoreError::ChoiceNotFound(_) => {
        (StatusCode::NOT_FOUND, message).into_response()
      }

      CoreError::RateLimited { retry_after_secs } => {
        let mut res = (StatusCode::SERVICE_UNAVAILABLE, message).into_response();
        res.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        res
      }

      CoreError::GenerationFailed(_) => (StatusCode::BAD_GATEWAY, message).into_response(),

      CoreError::Conflict(_) => (StatusCode::CONFLICT, message).into_response(),

      CoreError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal store error").into_response()
      }
    }
  }
}
