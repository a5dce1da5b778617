// server/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

use super::{CartRepository, OrderRepository, ProductRepository, ReviewRepository, StoreResult};
use crate::models::{
  CartLine, CartLineView, NewOrder, NewProduct, NewReview, Order, OrderView, Product, ProductPatch, ProductSummary,
  Review, ReviewPatch,
};
use crate::query::{CollectionQuery, Condition, Filter, SortKey, Value};

const PRODUCT_COLUMNS: &str =
  "id, title, description, price, category, image, rating, seller_id, version, created_at, updated_at";
const CART_COLUMNS: &str = "id, user_id, product_id, quantity, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, product_id, amount, payment_status, order_at";
const REVIEW_COLUMNS: &str = "id, product_id, user_id, rating, review, created_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
  match value {
    Value::Number(n) => qb.push_bind(*n),
    Value::Text(s) => qb.push_bind(s.clone()),
    Value::Id(id) => qb.push_bind(*id),
    Value::Time(ts) => qb.push_bind(*ts),
  };
}

/// Column names come from the static field schema; values are always bound.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
  for (i, clause) in filter.clauses.iter().enumerate() {
    qb.push(if i == 0 { " WHERE " } else { " AND " });
    let column = clause.field.column;
    match &clause.condition {
      Condition::Eq(value) => {
        qb.push(column).push(" = ");
        push_value(qb, value);
      }
      Condition::In(values) => {
        qb.push(column).push(" IN (");
        for (j, value) in values.iter().enumerate() {
          if j > 0 {
            qb.push(", ");
          }
          push_value(qb, value);
        }
        qb.push(")");
      }
      Condition::Range(range) => {
        if range.bounds.is_empty() {
          qb.push("TRUE");
        }
        for (j, (op, value)) in range.bounds.iter().enumerate() {
          if j > 0 {
            qb.push(" AND ");
          }
          qb.push(column).push(" ").push(op.sql()).push(" ");
          push_value(qb, value);
        }
      }
    }
  }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: &[SortKey]) {
  qb.push(" ORDER BY ");
  for key in sort {
    qb.push(key.field.column)
      .push(if key.descending { " DESC, " } else { " ASC, " });
  }
  qb.push("id ASC");
}

fn as_i64(n: u64) -> i64 {
  i64::try_from(n).unwrap_or(i64::MAX)
}

#[derive(FromRow)]
struct CartLineRow {
  id: Uuid,
  user_id: Uuid,
  product_id: Uuid,
  quantity: i32,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
  product_title: String,
  product_price: f64,
  product_image: Option<String>,
}

impl From<CartLineRow> for CartLineView {
  fn from(row: CartLineRow) -> Self {
    CartLineView {
      id: row.id,
      user: row.user_id,
      product: ProductSummary {
        id: row.product_id,
        title: row.product_title,
        price: row.product_price,
        image: row.product_image,
      },
      quantity: row.quantity,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

#[async_trait]
impl ProductRepository for PgStore {
  #[instrument(name = "store::find_products", level = "debug", skip_all, fields(clauses = query.filter.clauses.len()))]
  async fn find_products(&self, query: &CollectionQuery) -> StoreResult<Vec<Product>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
    push_filter(&mut qb, &query.filter);
    push_order(&mut qb, &query.sort);
    if let Some(limit) = query.limit {
      qb.push(" LIMIT ").push_bind(as_i64(limit));
    }
    qb.push(" OFFSET ").push_bind(as_i64(query.skip));

    let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
    Ok(products)
  }

  #[instrument(name = "store::get_product", level = "debug", skip(self))]
  async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(product)
  }

  #[instrument(name = "store::insert_product", level = "debug", skip_all, fields(seller = ?product.seller))]
  async fn insert_product(&self, product: NewProduct) -> StoreResult<Product> {
    let sql = format!(
      "INSERT INTO products (id, title, description, price, category, image, rating, seller_id)
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
       RETURNING {}",
      PRODUCT_COLUMNS
    );
    let created = sqlx::query_as::<_, Product>(&sql)
      .bind(Uuid::new_v4())
      .bind(product.title)
      .bind(product.description)
      .bind(product.price)
      .bind(product.category)
      .bind(product.image)
      .bind(product.rating)
      .bind(product.seller)
      .fetch_one(&self.pool)
      .await?;
    Ok(created)
  }

  #[instrument(name = "store::update_owned_product", level = "debug", skip(self, patch))]
  async fn update_owned_product(&self, id: Uuid, seller: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
    let sql = format!(
      "UPDATE products SET
         title = COALESCE($3, title),
         description = COALESCE($4, description),
         price = COALESCE($5, price),
         category = COALESCE($6, category),
         image = COALESCE($7, image),
         rating = COALESCE($8, rating),
         version = version + 1,
         updated_at = NOW()
       WHERE id = $1 AND seller_id = $2
       RETURNING {}",
      PRODUCT_COLUMNS
    );
    let updated = sqlx::query_as::<_, Product>(&sql)
      .bind(id)
      .bind(seller)
      .bind(patch.title)
      .bind(patch.description)
      .bind(patch.price)
      .bind(patch.category)
      .bind(patch.image)
      .bind(patch.rating)
      .fetch_optional(&self.pool)
      .await?;
    Ok(updated)
  }

  #[instrument(name = "store::delete_owned_product", level = "debug", skip(self))]
  async fn delete_owned_product(&self, id: Uuid, seller: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1 AND seller_id = $2")
      .bind(id)
      .bind(seller)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl CartRepository for PgStore {
  #[instrument(name = "store::find_cart_line", level = "debug", skip(self))]
  async fn find_cart_line(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<CartLine>> {
    let sql = format!(
      "SELECT {} FROM cart_items WHERE user_id = $1 AND product_id = $2",
      CART_COLUMNS
    );
    let line = sqlx::query_as::<_, CartLine>(&sql)
      .bind(user_id)
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(line)
  }

  #[instrument(name = "store::insert_cart_line", level = "debug", skip(self))]
  async fn insert_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartLine> {
    let sql = format!(
      "INSERT INTO cart_items (id, user_id, product_id, quantity) VALUES ($1, $2, $3, $4) RETURNING {}",
      CART_COLUMNS
    );
    let line = sqlx::query_as::<_, CartLine>(&sql)
      .bind(Uuid::new_v4())
      .bind(user_id)
      .bind(product_id)
      .bind(quantity)
      .fetch_one(&self.pool)
      .await?;
    Ok(line)
  }

  #[instrument(name = "store::increment_cart_line", level = "debug", skip(self))]
  async fn increment_cart_line(&self, line_id: Uuid, by: i32) -> StoreResult<Option<CartLine>> {
    let sql = format!(
      "UPDATE cart_items SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
      CART_COLUMNS
    );
    let line = sqlx::query_as::<_, CartLine>(&sql)
      .bind(line_id)
      .bind(by)
      .fetch_optional(&self.pool)
      .await?;
    Ok(line)
  }

  #[instrument(name = "store::list_cart", level = "debug", skip(self))]
  async fn list_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartLineView>> {
    let rows = sqlx::query_as::<_, CartLineRow>(
      "SELECT c.id, c.user_id, c.product_id, c.quantity, c.created_at, c.updated_at,
              p.title AS product_title, p.price AS product_price, p.image AS product_image
       FROM cart_items c
       JOIN products p ON p.id = c.product_id
       WHERE c.user_id = $1
       ORDER BY c.created_at DESC, c.id ASC",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows.into_iter().map(CartLineView::from).collect())
  }

  #[instrument(name = "store::delete_owned_cart_line", level = "debug", skip(self))]
  async fn delete_owned_cart_line(&self, line_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
      .bind(line_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl OrderRepository for PgStore {
  #[instrument(name = "store::find_recent_order", level = "debug", skip(self))]
  async fn find_recent_order(&self, user_id: Uuid, product_id: Uuid, since: DateTime<Utc>) -> StoreResult<Option<Order>> {
    let sql = format!(
      "SELECT {} FROM orders
       WHERE user_id = $1 AND product_id = $2 AND order_at >= $3
       ORDER BY order_at DESC
       LIMIT 1",
      ORDER_COLUMNS
    );
    let order = sqlx::query_as::<_, Order>(&sql)
      .bind(user_id)
      .bind(product_id)
      .bind(since)
      .fetch_optional(&self.pool)
      .await?;
    Ok(order)
  }

  #[instrument(name = "store::insert_order", level = "debug", skip_all, fields(user_id = %order.user_id, product_id = %order.product_id))]
  async fn insert_order(&self, order: NewOrder) -> StoreResult<Order> {
    let sql = format!(
      "INSERT INTO orders (id, user_id, product_id, amount, payment_status) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      ORDER_COLUMNS
    );
    let created = sqlx::query_as::<_, Order>(&sql)
      .bind(Uuid::new_v4())
      .bind(order.user_id)
      .bind(order.product_id)
      .bind(order.amount)
      .bind(order.payment_status)
      .fetch_one(&self.pool)
      .await?;
    Ok(created)
  }

  /// Orders first, then their products in one query, joined in memory.
  #[instrument(name = "store::list_orders", level = "debug", skip(self))]
  async fn list_orders(&self, user_id: Uuid) -> StoreResult<Vec<OrderView>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY order_at DESC, id ASC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    let product_ids: Vec<Uuid> = orders.iter().filter_map(|o| o.product_id).collect();
    let products: HashMap<Uuid, Product> = if product_ids.is_empty() {
      HashMap::new()
    } else {
      sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM products WHERE id = ANY($1)",
        PRODUCT_COLUMNS
      ))
      .bind(product_ids)
      .fetch_all(&self.pool)
      .await?
      .into_iter()
      .map(|p| (p.id, p))
      .collect()
    };

    Ok(
      orders
        .into_iter()
        .map(|order| {
          let product = order.product_id.and_then(|id| products.get(&id).cloned());
          OrderView::new(order, product)
        })
        .collect(),
    )
  }

  #[instrument(name = "store::delete_owned_order", level = "debug", skip(self))]
  async fn delete_owned_order(&self, order_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND user_id = $2")
      .bind(order_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl ReviewRepository for PgStore {
  #[instrument(name = "store::insert_review", level = "debug", skip_all, fields(product_id = %review.product_id))]
  async fn insert_review(&self, review: NewReview) -> StoreResult<Review> {
    let sql = format!(
      "INSERT INTO reviews (id, product_id, user_id, rating, review) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
      REVIEW_COLUMNS
    );
    let created = sqlx::query_as::<_, Review>(&sql)
      .bind(Uuid::new_v4())
      .bind(review.product_id)
      .bind(review.user_id)
      .bind(review.rating)
      .bind(review.review)
      .fetch_one(&self.pool)
      .await?;
    Ok(created)
  }

  #[instrument(name = "store::list_reviews", level = "debug", skip(self))]
  async fn list_reviews(&self, product_id: Option<Uuid>) -> StoreResult<Vec<Review>> {
    let sql = format!(
      "SELECT {} FROM reviews WHERE ($1::uuid IS NULL OR product_id = $1) ORDER BY created_at DESC, id ASC",
      REVIEW_COLUMNS
    );
    let reviews = sqlx::query_as::<_, Review>(&sql)
      .bind(product_id)
      .fetch_all(&self.pool)
      .await?;
    Ok(reviews)
  }

  #[instrument(name = "store::update_owned_review", level = "debug", skip(self, patch))]
  async fn update_owned_review(&self, id: Uuid, user_id: Uuid, patch: ReviewPatch) -> StoreResult<Option<Review>> {
    let sql = format!(
      "UPDATE reviews SET rating = COALESCE($3, rating), review = COALESCE($4, review)
       WHERE id = $1 AND user_id = $2
       RETURNING {}",
      REVIEW_COLUMNS
    );
    let updated = sqlx::query_as::<_, Review>(&sql)
      .bind(id)
      .bind(user_id)
      .bind(patch.rating)
      .bind(patch.review)
      .fetch_optional(&self.pool)
      .await?;
    Ok(updated)
  }

  #[instrument(name = "store::delete_owned_review", level = "debug", skip(self))]
  async fn delete_owned_review(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
      .bind(id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() > 0)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{QueryFeatures, PRODUCT_SCHEMA};

  fn sql_for(raw: &[(&str, &str)]) -> String {
    let params = raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let query = QueryFeatures::new(&PRODUCT_SCHEMA, Filter::new(), params)
      .filter()
      .unwrap()
      .sort()
      .unwrap()
      .paginate()
      .build();
    let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM products");
    push_filter(&mut qb, &query.filter);
    push_order(&mut qb, &query.sort);
    qb.sql().to_string()
  }

  #[test]
  fn filters_become_bound_predicates() {
    let sql = sql_for(&[("category", "books"), ("price[gte]", "25"), ("price[lte]", "50")]);
    assert_eq!(
      sql,
      "SELECT id FROM products WHERE category = $1 AND price >= $2 AND price <= $3 ORDER BY created_at DESC, id ASC"
    );
  }

  #[test]
  fn repeated_values_become_an_in_list() {
    let sql = sql_for(&[("category", "books"), ("category", "games"), ("sort", "price,-title")]);
    assert_eq!(
      sql,
      "SELECT id FROM products WHERE category IN ($1, $2) ORDER BY price ASC, title DESC, id ASC"
    );
  }

  #[test]
  fn api_names_map_to_columns() {
    let sql = sql_for(&[("seller", "7f9d1b7e-4a43-4f4e-9a7b-0c8a2b1d9e11"), ("sort", "-updatedAt")]);
    assert_eq!(
      sql,
      "SELECT id FROM products WHERE seller_id = $1 ORDER BY updated_at DESC, id ASC"
    );
  }
}
