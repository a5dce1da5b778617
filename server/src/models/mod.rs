// server/src/models/mod.rs

//! Records stored by the repositories and the request bodies that create them.

pub mod cart_line;
pub mod order;
pub mod product;
pub mod review;

pub use cart_line::{CartLine, CartLineView};
pub use order::{NewOrder, Order, OrderView, PaymentStatus};
pub use product::{NewProduct, Product, ProductDetail, ProductInput, ProductPatch, ProductSummary};
pub use review::{NewReview, Review, ReviewInput, ReviewPatch};

use crate::errors::AppError;

/// Trims `value` and rejects it when nothing is left.
pub(crate) fn required_text(field: &str, value: Option<String>) -> Result<String, AppError> {
  match value.map(|v| v.trim().to_string()) {
    Some(v) if !v.is_empty() => Ok(v),
    _ => Err(AppError::Validation(format!("{} is required", field))),
  }
}
