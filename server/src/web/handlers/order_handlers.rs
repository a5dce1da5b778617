// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_flow::{Outcome, Shared};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::OrderView;
use crate::pipelines::contexts::CreateOrderCtx;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// Only `product` is read. A client-sent `amount` or `paymentStatus` is ignored.
#[derive(Deserialize, Debug)]
pub struct CreateOrderPayload {
  pub product: Option<Uuid>,
}

#[instrument(
  name = "handler::create_order",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.user_id, product_id = ?payload.product)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CreateOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx = Shared::new(CreateOrderCtx::new(
    app_state.get_ref().clone(),
    auth_user.user_id,
    payload.product,
  ));

  let outcome = match app_state.flows.run(ctx.clone()).await {
    Ok(outcome) => outcome,
    Err(app_err) => {
      warn!(error = %app_err, "Create Order pipeline failed.");
      return Err(app_err);
    }
  };

  let (order, product, replayed) = {
    let guard = ctx.read();
    (guard.order.clone(), guard.product.clone(), guard.replayed)
  };
  let order = order.ok_or_else(|| AppError::Internal("order missing after create".to_string()))?;
  let view = OrderView::new(order, product);
  let body = json!({ "status": "success", "data": { "order": view } });

  // A replay stops the pipeline before insert and answers 200 with the earlier order.
  match (outcome, replayed) {
    (Outcome::Completed, _) => {
      info!(order_id = %view.id, "Order created.");
      Ok(HttpResponse::Created().json(body))
    }
    (Outcome::Stopped, true) => {
      info!(order_id = %view.id, "Order replayed.");
      Ok(HttpResponse::Ok().json(body))
    }
    // Only the dedup step may stop, and it always marks the replay.
    (Outcome::Stopped, false) => {
      warn!("Create Order pipeline was stopped without a replay.");
      Err(AppError::Internal("order creation was halted".to_string()))
    }
  }
}

#[instrument(name = "handler::my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.repos.orders.list_orders(auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "status": "success", "data": { "orders": orders } })))
}

#[instrument(
  name = "handler::delete_order",
  skip(app_state, path, auth_user),
  fields(user_id = %auth_user.user_id, order_id = %path)
)]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let deleted = app_state
    .repos
    .orders
    .delete_owned_order(path.into_inner(), auth_user.user_id)
    .await?;
  if !deleted {
    return Err(AppError::NotFound("No order found with that ID".to_string()));
  }
  Ok(HttpResponse::NoContent().finish())
}
