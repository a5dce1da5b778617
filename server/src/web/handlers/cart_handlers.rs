// server/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_flow::{Outcome, Shared};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::AddToCartCtx;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartPayload {
  pub product_id: Option<Uuid>,
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = ?payload.product_id)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<AddToCartPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(AddToCartCtx::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    payload.product_id,
  ));

  match app_state.flows.run(ctx.clone()).await {
    Ok(Outcome::Completed) => {
      let line = ctx.read().cart_line.clone().ok_or_else(|| {
        warn!("Add to Cart pipeline completed without a cart line.");
        AppError::Internal("cart line missing after add".to_string())
      })?;
      info!(cart_line_id = %line.id, quantity = line.quantity, "Item added to cart.");
      Ok(HttpResponse::Ok().json(json!({ "status": "success", "cartItem": line })))
    }
    // No add step stops early, so a halt means a step broke its contract.
    Ok(Outcome::Stopped) => {
      warn!("Add to Cart pipeline was stopped by a handler.");
      Err(AppError::Internal("add to cart was halted".to_string()))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Add to Cart pipeline failed.");
      Err(app_err)
    }
  }
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = app_state.repos.carts.list_cart(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "cart": cart })))
}

#[instrument(
  name = "handler::remove_cart_item",
  skip(app_state, path, auth_user),
  fields(user_id = %auth_user.user_id, cart_line_id = %path)
)]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let removed = app_state
    .repos
    .carts
    .delete_owned_cart_line(path.into_inner(), auth_user.user_id)
    .await?;
  if !removed {
    return Err(AppError::NotFound("Cart item not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "message": "Item removed" })))
}
