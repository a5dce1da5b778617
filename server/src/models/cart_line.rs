// server/src/models/cart_line.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::ProductSummary;

/// One (user, product, quantity) record. The store keeps at most one per pair.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub id: Uuid,
  #[serde(rename = "user")]
  pub user_id: Uuid,
  #[serde(rename = "product")]
  pub product_id: Uuid,
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A cart line with its product joined in, as listed by `getCart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
  pub id: Uuid,
  pub user: Uuid,
  pub product: ProductSummary,
  pub quantity: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl CartLineView {
  pub fn new(line: CartLine, product: ProductSummary) -> Self {
    Self {
      id: line.id,
      user: line.user_id,
      product,
      quantity: line.quantity,
      created_at: line.created_at,
      updated_at: line.updated_at,
    }
  }
}
