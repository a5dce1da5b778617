// server/src/web/extractors.rs

use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "jwt";

/// The verified session behind a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
  pub role: Option<String>,
}

impl AuthenticatedUser {
  /// Sessions without a role claim count as plain users.
  pub fn has_role(&self, role: &str) -> bool {
    self.role.as_deref().map_or(true, |r| r == role)
  }
}

/// The session cookie, or else an `Authorization: Bearer` header.
fn session_token(req: &HttpRequest) -> Option<String> {
  if let Some(cookie) = req.cookie(SESSION_COOKIE) {
    let value = cookie.value().trim();
    if !value.is_empty() {
      return Some(value.to_string());
    }
  }
  req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|h| h.to_str().ok())
    .and_then(|h| h.strip_prefix("Bearer "))
    .map(|t| t.trim().to_string())
    .filter(|t| !t.is_empty())
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
      return ready(Err(AppError::Internal("application state is not configured".to_string())));
    };
    let Some(token) = session_token(req) else {
      warn!(path = %req.path(), "Request without a session token.");
      return ready(Err(AppError::Auth(
        "You are not logged in! Please log in to get access.".to_string(),
      )));
    };

    ready(state.sessions.verify(&token).map(|claims| AuthenticatedUser {
      user_id: claims.id,
      role: claims.role,
    }))
  }
}
