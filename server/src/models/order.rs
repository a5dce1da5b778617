// server/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PaymentStatus::Pending => f.write_str("pending"),
      PaymentStatus::Paid => f.write_str("paid"),
    }
  }
}

impl FromStr for PaymentStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "pending" => Ok(PaymentStatus::Pending),
      "paid" => Ok(PaymentStatus::Paid),
      other => Err(format!("expected 'pending' or 'paid', got '{}'", other)),
    }
  }
}

/// A purchase record. `amount` is copied from the product price when the order is created.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  #[serde(rename = "user")]
  pub user_id: Uuid,
  /// Cleared when the product is deleted.
  #[serde(rename = "product")]
  pub product_id: Option<Uuid>,
  pub amount: f64,
  pub payment_status: PaymentStatus,
  pub order_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub amount: f64,
  pub payment_status: PaymentStatus,
}

/// An order with its product joined in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
  pub id: Uuid,
  pub user: Uuid,
  pub product: Option<Product>,
  pub amount: f64,
  pub payment_status: PaymentStatus,
  pub order_at: DateTime<Utc>,
}

impl OrderView {
  pub fn new(order: Order, product: Option<Product>) -> Self {
    Self {
      id: order.id,
      user: order.user_id,
      product,
      amount: order.amount,
      payment_status: order.payment_status,
      order_at: order.order_at,
    }
  }
}
