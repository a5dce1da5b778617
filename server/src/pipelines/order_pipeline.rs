// server/src/pipelines/order_pipeline.rs

use chrono::{Duration, Utc};
use storefront_flow::{Control, Flow, Registry, Shared};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::NewOrder;
use crate::pipelines::contexts::CreateOrderCtx;

pub fn register_create_order_pipeline(registry: &Registry<AppError>) {
  let mut p = Flow::<CreateOrderCtx, AppError>::new(
    "create_order",
    &[
      ("validate_order_input", false, None),
      ("resolve_product_price", false, None),
      ("find_recent_order", false, None),
      ("persist_order", false, None),
    ],
  );

  p.on("validate_order_input", |ctx: Shared<CreateOrderCtx>| async move {
    let product_id = ctx.read().product_id;
    if product_id.is_none() {
      warn!("Create Order: request without a product.");
      return Err(AppError::Validation("An order must belong to a product".to_string()));
    }
    Ok(Control::Continue)
  });

  // The amount always comes from the stored product.
  p.on("resolve_product_price", |ctx: Shared<CreateOrderCtx>| async move {
    let (product_id, repos) = {
      let guard = ctx.read();
      (guard.product_id()?, guard.app_state.repos.clone())
    };

    let product = repos
      .products
      .get_product(product_id)
      .await?
      .ok_or_else(|| AppError::NotFound("No product found with that ID".to_string()))?;
    info!(%product_id, price = product.price, "Create Order: price resolved.");
    ctx.write().product = Some(product);
    Ok::<_, AppError>(Control::Continue)
  });

  p.on("find_recent_order", |ctx: Shared<CreateOrderCtx>| async move {
    let (user_id, product_id, window_secs, repos) = {
      let guard = ctx.read();
      (
        guard.user_id,
        guard.product_id()?,
        guard.app_state.config.order_dedup_window_secs,
        guard.app_state.repos.clone(),
      )
    };

    let since = Duration::try_seconds(window_secs)
      .and_then(|window| Utc::now().checked_sub_signed(window))
      .ok_or_else(|| AppError::Internal(format!("dedup window of {}s is out of range", window_secs)))?;
    // A hit ends the pipeline here so nothing new is inserted.
    match repos.orders.find_recent_order(user_id, product_id, since).await? {
      Some(existing) => {
        info!(order_id = %existing.id, "Create Order: replaying order inside dedup window.");
        let mut guard = ctx.write();
        guard.order = Some(existing);
        guard.replayed = true;
        Ok(Control::Stop)
      }
      None => Ok::<_, AppError>(Control::Continue),
    }
  });

  p.on("persist_order", |ctx: Shared<CreateOrderCtx>| async move {
    let (new_order, repos) = {
      let guard = ctx.read();
      let product = guard
        .product
        .as_ref()
        .ok_or_else(|| AppError::Internal("order price was not resolved".to_string()))?;
      (
        NewOrder {
          user_id: guard.user_id,
          product_id: product.id,
          amount: product.price,
          payment_status: guard.app_state.config.order_initial_payment_status,
        },
        guard.app_state.repos.clone(),
      )
    };

    let order = repos.orders.insert_order(new_order).await?;
    info!(order_id = %order.id, amount = order.amount, "Create Order: order persisted.");
    ctx.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  registry.register(p);
}
