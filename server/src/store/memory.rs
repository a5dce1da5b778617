// server/src/store/memory.rs

//! A process-local store with the same constraints as the Postgres schema:
//! one cart line per (user, product), foreign keys on product references,
//! and cascade / set-null on product delete.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::{CartRepository, OrderRepository, ProductRepository, ReviewRepository, StoreError, StoreResult};
use crate::models::{
  CartLine, CartLineView, NewOrder, NewProduct, NewReview, Order, OrderView, Product, ProductPatch, ProductSummary,
  Review, ReviewPatch,
};
use crate::query::{CollectionQuery, Document, FieldSpec, Value};

impl Document for Product {
  fn id(&self) -> Uuid {
    self.id
  }

  fn field_value(&self, field: &FieldSpec) -> Option<Value> {
    match field.name {
      "id" => Some(Value::Id(self.id)),
      "title" => Some(Value::Text(self.title.clone())),
      "description" => Some(Value::Text(self.description.clone())),
      "price" => Some(Value::Number(self.price)),
      "category" => Some(Value::Text(self.category.clone())),
      "image" => self.image.clone().map(Value::Text),
      "rating" => self.rating.map(Value::Number),
      "seller" => self.seller.map(Value::Id),
      "version" => Some(Value::Number(f64::from(self.version))),
      "createdAt" => Some(Value::Time(self.created_at)),
      "updatedAt" => Some(Value::Time(self.updated_at)),
      _ => None,
    }
  }
}

#[derive(Default)]
struct Tables {
  products: Vec<Product>,
  cart_lines: Vec<CartLine>,
  orders: Vec<Order>,
  reviews: Vec<Review>,
  last_tick: Option<DateTime<Utc>>,
}

impl Tables {
  /// Wall-clock time, nudged forward so no two writes share a timestamp.
  fn tick(&mut self) -> DateTime<Utc> {
    let now = Utc::now();
    let next = match self.last_tick {
      Some(last) if now <= last => last + Duration::microseconds(1),
      _ => now,
    };
    self.last_tick = Some(next);
    next
  }

  fn product(&self, id: Uuid) -> Option<&Product> {
    self.products.iter().find(|p| p.id == id)
  }

  fn require_product(&self, id: Uuid) -> StoreResult<()> {
    match self.product(id) {
      Some(_) => Ok(()),
      None => Err(StoreError::MissingReference(format!("product {} does not exist", id))),
    }
  }
}

#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Moves an order's timestamp into the past. Returns `false` when the order is unknown.
  pub fn backdate_order(&self, order_id: Uuid, by: Duration) -> bool {
    let mut tables = self.tables.lock();
    match tables.orders.iter_mut().find(|o| o.id == order_id) {
      Some(order) => {
        order.order_at -= by;
        true
      }
      None => false,
    }
  }

  pub fn order_count(&self) -> usize {
    self.tables.lock().orders.len()
  }

  pub fn cart_line_count(&self) -> usize {
    self.tables.lock().cart_lines.len()
  }
}

#[async_trait]
impl ProductRepository for MemoryStore {
  async fn find_products(&self, query: &CollectionQuery) -> StoreResult<Vec<Product>> {
    let products = self.tables.lock().products.clone();
    Ok(query.execute(products))
  }

  async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.tables.lock().product(id).cloned())
  }

  async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
    let mut tables = self.tables.lock();
    let now = tables.tick();
    let created = Product {
      id: Uuid::new_v4(),
      title: product.title,
      description: product.description,
      price: product.price,
      category: product.category,
      image: product.image,
      rating: product.rating,
      seller: product.seller,
      version: 0,
      created_at: now,
      updated_at: now,
    };
    tables.products.push(created.clone());
    Ok(created)
  }

  async fn update_owned_product(&self, id: Uuid, seller: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
    let mut tables = self.tables.lock();
    let now = tables.tick();
    let Some(product) = tables
      .products
      .iter_mut()
      .find(|p| p.id == id && p.seller == Some(seller))
    else {
      return Ok(None);
    };
    patch.apply_to(product);
    product.version += 1;
    product.updated_at = now;
    Ok(Some(product.clone()))
  }

  async fn delete_owned_product(&self, id: Uuid, seller: Uuid) -> StoreResult<bool> {
    let mut tables = self.tables.lock();
    let before = tables.products.len();
    tables.products.retain(|p| !(p.id == id && p.seller == Some(seller)));
    if tables.products.len() == before {
      return Ok(false);
    }
    tables.cart_lines.retain(|l| l.product_id != id);
    tables.reviews.retain(|r| r.product_id != id);
    for order in tables.orders.iter_mut().filter(|o| o.product_id == Some(id)) {
      order.product_id = None;
    }
    Ok(true)
  }
}

#[async_trait]
impl CartRepository for MemoryStore {
  async fn find_cart_line(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<CartLine>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .cart_lines
        .iter()
        .find(|l| l.user_id == user_id && l.product_id == product_id)
        .cloned(),
    )
  }

  async fn insert_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartLine> {
    let mut tables = self.tables.lock();
    tables.require_product(product_id)?;
    if tables
      .cart_lines
      .iter()
      .any(|l| l.user_id == user_id && l.product_id == product_id)
    {
      return Err(StoreError::Conflict(
        "duplicate key value violates unique constraint \"cart_items_user_product_key\"".to_string(),
      ));
    }
    let now = tables.tick();
    let line = CartLine {
      id: Uuid::new_v4(),
      user_id,
      product_id,
      quantity,
      created_at: now,
      updated_at: now,
    };
    tables.cart_lines.push(line.clone());
    Ok(line)
  }

  async fn increment_cart_line(&self, line_id: Uuid, by: i32) -> StoreResult<Option<CartLine>> {
    let mut tables = self.tables.lock();
    let now = tables.tick();
    Ok(tables.cart_lines.iter_mut().find(|l| l.id == line_id).map(|line| {
      line.quantity += by;
      line.updated_at = now;
      line.clone()
    }))
  }

  async fn list_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartLineView>> {
    let tables = self.tables.lock();
    let mut lines: Vec<CartLineView> = tables
      .cart_lines
      .iter()
      .filter(|l| l.user_id == user_id)
      .filter_map(|l| {
        tables
          .product(l.product_id)
          .map(|p| CartLineView::new(l.clone(), ProductSummary::from(p)))
      })
      .collect();
    lines.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    Ok(lines)
  }

  async fn delete_owned_cart_line(&self, line_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    let mut tables = self.tables.lock();
    let before = tables.cart_lines.len();
    tables.cart_lines.retain(|l| !(l.id == line_id && l.user_id == user_id));
    Ok(tables.cart_lines.len() < before)
  }
}

#[async_trait]
impl OrderRepository for MemoryStore {
  async fn find_recent_order(&self, user_id: Uuid, product_id: Uuid, since: DateTime<Utc>) -> StoreResult<Option<Order>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .orders
        .iter()
        .filter(|o| o.user_id == user_id && o.product_id == Some(product_id) && o.order_at >= since)
        .max_by_key(|o| o.order_at)
        .cloned(),
    )
  }

  async fn insert_order(&self, order: NewOrder) -> StoreResult<Order> {
    let mut tables = self.tables.lock();
    tables.require_product(order.product_id)?;
    let created = Order {
      id: Uuid::new_v4(),
      user_id: order.user_id,
      product_id: Some(order.product_id),
      amount: order.amount,
      payment_status: order.payment_status,
      order_at: tables.tick(),
    };
    tables.orders.push(created.clone());
    Ok(created)
  }

  async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<OrderView>> {
    let tables = self.tables.lock();
    let mut orders: Vec<&Order> = tables.orders.iter().filter(|o| o.user_id == user_id).collect();
    orders.sort_by(|a, b| b.order_at.cmp(&a.order_at).then(a.id.cmp(&b.id)));
    Ok(
      orders
        .into_iter()
        .map(|o| {
          let product = o.product_id.and_then(|id| tables.product(id).cloned());
          OrderView::new(o.clone(), product)
        })
        .collect(),
    )
  }

  async fn delete_owned_order(&self, order_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    let mut tables = self.tables.lock();
    let before = tables.orders.len();
    tables.orders.retain(|o| !(o.id == order_id && o.user_id == user_id));
    Ok(tables.orders.len() < before)
  }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
  async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
    let mut tables = self.tables.lock();
    tables.require_product(review.product_id)?;
    let created = Review {
      id: Uuid::new_v4(),
      product_id: review.product_id,
      user_id: review.user_id,
      rating: review.rating,
      review: review.review,
      created_at: tables.tick(),
    };
    tables.reviews.push(created.clone());
    Ok(created)
  }

  async fn list_reviews(&self, product_id: Option<Uuid>) -> StoreResult<Vec<Review>> {
    let tables = self.tables.lock();
    let mut reviews: Vec<Review> = tables
      .reviews
      .iter()
      .filter(|r| product_id.map_or(true, |p| r.product_id == p))
      .cloned()
      .collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    Ok(reviews)
  }

  async fn update_owned_review(&self, id: Uuid, user_id: Uuid, patch: ReviewPatch) -> StoreResult<Option<Review>> {
    let mut tables = self.tables.lock();
    Ok(
      tables
        .reviews
        .iter_mut()
        .find(|r| r.id == id && r.user_id == user_id)
        .map(|review| {
          patch.apply_to(review);
          review.clone()
        }),
    )
  }

  async fn delete_owned_review(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    let mut tables = self.tables.lock();
    let before = tables.reviews.len();
    tables.reviews.retain(|r| !(r.id == id && r.user_id == user_id));
    Ok(tables.reviews.len() < before)
  }
}
