// server/src/store/mod.rs

//! Repository traits over products, cart lines, orders and reviews, with a
//! Postgres implementation and an in-memory one.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
  CartLine, CartLineView, NewOrder, NewProduct, NewReview, Order, OrderView, Product, ProductPatch, Review,
  ReviewPatch,
};
use crate::query::CollectionQuery;

#[derive(Debug, Error)]
pub enum StoreError {
  /// A unique index rejected the write.
  #[error("{0}")]
  Conflict(String),

  /// A foreign key points at a row that does not exist.
  #[error("{0}")]
  MissingReference(String),

  #[error("Database error: {0}")]
  Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
  fn from(err: sqlx::Error) -> Self {
    if let sqlx::Error::Database(db_err) = &err {
      if db_err.is_unique_violation() {
        return StoreError::Conflict(db_err.message().to_string());
      }
      if db_err.is_foreign_key_violation() {
        return StoreError::MissingReference(db_err.message().to_string());
      }
    }
    StoreError::Database(err)
  }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait ProductRepository: Send + Sync {
  async fn find_products(&self, query: &CollectionQuery) -> StoreResult<Vec<Product>>;

  async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;

  async fn insert_product(&self, product: NewProduct) -> StoreResult<Product>;

  /// Applies `patch` only when `seller` owns the product. Bumps `version`.
  async fn update_owned_product(&self, id: Uuid, seller: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>>;

  /// Deleting a product removes its cart lines and reviews and clears it from orders.
  async fn delete_owned_product(&self, id: Uuid, seller: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
  async fn find_cart_line(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<CartLine>>;

  /// Fails with [`StoreError::Conflict`] when a line for the pair already exists.
  async fn insert_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartLine>;

  /// Adds `by` to the quantity in a single write. `None` when the line is gone.
  async fn increment_cart_line(&self, line_id: Uuid, by: i32) -> StoreResult<Option<CartLine>>;

  /// Newest first.
  async fn list_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartLineView>>;

  async fn delete_owned_cart_line(&self, line_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
  /// Most recent order for the pair placed at or after `since`.
  async fn find_recent_order(&self, user_id: Uuid, product_id: Uuid, since: DateTime<Utc>) -> StoreResult<Option<Order>>;

  async fn insert_order(&self, order: NewOrder) -> StoreResult<Order>;

  /// Newest first by `orderAt`.
  async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<OrderView>>;

  async fn delete_owned_order(&self, order_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
  async fn insert_review(&self, review: NewReview) -> StoreResult<Review>;

  async fn list_reviews(&self, product_id: Option<Uuid>) -> StoreResult<Vec<Review>>;

  async fn update_owned_review(&self, id: Uuid, user_id: Uuid, patch: ReviewPatch) -> StoreResult<Option<Review>>;

  async fn delete_owned_review(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;
}

/// Handles to every repository, cheap to clone into request contexts.
#[derive(Clone)]
pub struct Repositories {
  pub products: Arc<dyn ProductRepository>,
  pub carts: Arc<dyn CartRepository>,
  pub orders: Arc<dyn OrderRepository>,
  pub reviews: Arc<dyn ReviewRepository>,
}

impl Repositories {
  /// Serves every repository from one backing store.
  pub fn shared<S>(store: Arc<S>) -> Self
  where
    S: ProductRepository + CartRepository + OrderRepository + ReviewRepository + 'static,
  {
    Self {
      products: store.clone(),
      carts: store.clone(),
      orders: store.clone(),
      reviews: store,
    }
  }

  pub fn postgres(pool: PgPool) -> Self {
    Self::shared(Arc::new(PgStore::new(pool)))
  }
}
