// server/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use storefront_flow::{Outcome, Shared};
use tracing::{instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::CheckoutSessionCtx;
use crate::services::CheckoutSessionRequest;
use crate::state::AppState;

#[instrument(
  name = "handler::create_checkout_session",
  skip(app_state, payload),
  fields(line_items = payload.line_items.len(), mode = %payload.mode)
)]
pub async fn create_checkout_session_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutSessionRequest>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(CheckoutSessionCtx::new(app_state.get_ref().clone(), payload.into_inner()));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let session = ctx
        .read()
        .session
        .clone()
        .ok_or_else(|| AppError::Internal("checkout session missing after create".to_string()))?;
      Ok(HttpResponse::Ok().json(json!({ "id": session.id, "url": session.url })))
    }
    // Every checkout step either continues or fails.
    Ok(Outcome::Stopped) => {
      warn!("Checkout pipeline was stopped by a handler.");
      Err(AppError::Internal("checkout was halted".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Checkout pipeline failed.");
      Err(app_err)
    }
  }
}
