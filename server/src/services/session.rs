// server/src/services/session.rs

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result};

/// Claims carried by a session token. Tokens are issued elsewhere; this server only verifies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
  pub id: Uuid,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub role: Option<String>,
  pub exp: usize,
}

pub struct SessionVerifier {
  key: DecodingKey,
  validation: Validation,
}

impl SessionVerifier {
  pub fn new(secret: &str) -> Self {
    Self {
      key: DecodingKey::from_secret(secret.as_bytes()),
      validation: Validation::new(Algorithm::HS256),
    }
  }

  #[instrument(name = "session::verify", level = "debug", skip_all)]
  pub fn verify(&self, token: &str) -> Result<Claims> {
    match decode::<Claims>(token, &self.key, &self.validation) {
      Ok(data) => Ok(data.claims),
      Err(e) => {
        debug!(error = %e, "Session token rejected.");
        let message = match e.kind() {
          ErrorKind::ExpiredSignature => "Your token has expired! Please log in again.",
          _ => "Invalid token. Please log in again!",
        };
        Err(AppError::Auth(message.to_string()))
      }
    }
  }
}
