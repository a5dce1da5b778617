// server/src/pipelines/cart_pipeline.rs

use storefront_flow::{Control, Flow, Registry, Shared};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::CartLine;
use crate::pipelines::contexts::AddToCartCtx;
use crate::store::{Repositories, StoreError};

pub fn register_add_to_cart_pipeline(registry: &Registry<AppError>) {
  let mut p = Flow::<AddToCartCtx, AppError>::new(
    "add_to_cart",
    &[
      ("validate_cart_input", false, None),
      ("ensure_product_exists", false, None),
      ("find_existing_cart_line", false, None),
      ("upsert_cart_line", false, None),
    ],
  );

  p.on("validate_cart_input", |ctx: Shared<AddToCartCtx>| async move {
    let product_id = ctx.read().product_id;
    if product_id.is_none() {
      warn!("Add to Cart: request without a product id.");
      return Err(AppError::Validation("Product ID is required".to_string()));
    }
    Ok(Control::Continue)
  });

  p.on("ensure_product_exists", |ctx: Shared<AddToCartCtx>| async move {
    let (product_id, repos) = {
      let guard = ctx.read();
      (guard.product_id()?, guard.app_state.repos.clone())
    };

    if repos.products.get_product(product_id).await?.is_none() {
      warn!(%product_id, "Add to Cart: product not found.");
      return Err(AppError::NotFound("No product found with that ID".to_string()));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  p.on("find_existing_cart_line", |ctx: Shared<AddToCartCtx>| async move {
    let (user_id, product_id, repos) = {
      let guard = ctx.read();
      (guard.user_id, guard.product_id()?, guard.app_state.repos.clone())
    };

    let existing = repos.carts.find_cart_line(user_id, product_id).await?;
    ctx.write().existing_line = existing;
    Ok::<_, AppError>(Control::Continue)
  });

  p.on("upsert_cart_line", |ctx: Shared<AddToCartCtx>| async move {
    let (user_id, product_id, existing, repos) = {
      let guard = ctx.read();
      (
        guard.user_id,
        guard.product_id()?,
        guard.existing_line.clone(),
        guard.app_state.repos.clone(),
      )
    };

    // The line can vanish between lookup and increment, which falls through to insert.
    let incremented = match existing {
      Some(line) => repos.carts.increment_cart_line(line.id, 1).await?,
      None => None,
    };
    let line = match incremented {
      Some(line) => line,
      None => insert_or_increment(&repos, user_id, product_id).await?,
    };

    info!(cart_line_id = %line.id, quantity = line.quantity, "Add to Cart: line saved.");
    ctx.write().cart_line = Some(line);
    Ok::<_, AppError>(Control::Continue)
  });

  registry.register(p);
}

/// Inserts a fresh line. If the unique index says another request created the
/// pair first, that line is incremented instead.
async fn insert_or_increment(repos: &Repositories, user_id: Uuid, product_id: Uuid) -> Result<CartLine> {
  match repos.carts.insert_cart_line(user_id, product_id, 1).await {
    Ok(line) => Ok(line),
    Err(StoreError::Conflict(_)) => {
      warn!(%user_id, %product_id, "Add to Cart: line created concurrently, incrementing it.");
      let retry_err = || AppError::Conflict("Cart item changed while it was being updated".to_string());
      let line = repos
        .carts
        .find_cart_line(user_id, product_id)
        .await?
        .ok_or_else(retry_err)?;
      repos.carts.increment_cart_line(line.id, 1).await?.ok_or_else(retry_err)
    }
    Err(e) => Err(e.into()),
  }
}
