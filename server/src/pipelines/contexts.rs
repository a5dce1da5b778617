// server/src/pipelines/contexts.rs

//! Context structs for the coordinator pipelines. Handlers receive them wrapped in `Shared`.

use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{CartLine, Order, Product};
use crate::services::{CheckoutSession, CheckoutSessionRequest};
use crate::state::AppState;

fn require_product_id(product_id: Option<Uuid>, message: &str) -> Result<Uuid> {
  product_id.ok_or_else(|| AppError::Validation(message.to_string()))
}

pub struct AddToCartCtx {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Option<Uuid>,
  pub existing_line: Option<CartLine>,
  pub cart_line: Option<CartLine>,
}

impl AddToCartCtx {
  pub fn new(app_state: AppState, user_id: Uuid, product_id: Option<Uuid>) -> Self {
    Self {
      app_state,
      user_id,
      product_id,
      existing_line: None,
      cart_line: None,
    }
  }

  pub fn product_id(&self) -> Result<Uuid> {
    require_product_id(self.product_id, "Product ID is required")
  }
}

pub struct CreateOrderCtx {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Option<Uuid>,
  /// The stored product; its price becomes the order amount.
  pub product: Option<Product>,
  pub order: Option<Order>,
  /// Set when an order inside the dedup window was returned instead of a new one.
  pub replayed: bool,
}

impl CreateOrderCtx {
  pub fn new(app_state: AppState, user_id: Uuid, product_id: Option<Uuid>) -> Self {
    Self {
      app_state,
      user_id,
      product_id,
      product: None,
      order: None,
      replayed: false,
    }
  }

  pub fn product_id(&self) -> Result<Uuid> {
    require_product_id(self.product_id, "An order must belong to a product")
  }
}

pub struct CheckoutSessionCtx {
  pub app_state: AppState,
  pub request: CheckoutSessionRequest,
  pub session: Option<CheckoutSession>,
}

impl CheckoutSessionCtx {
  pub fn new(app_state: AppState, request: CheckoutSessionRequest) -> Self {
    Self {
      app_state,
      request,
      session: None,
    }
  }
}
