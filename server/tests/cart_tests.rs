// server/tests/cart_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use async_trait::async_trait;
use common::*;
use futures_util::future::join_all;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use storefront_server::models::{CartLine, CartLineView};
use storefront_server::services::payment_gateway::MockPaymentGateway;
use storefront_server::state::AppState;
use storefront_server::store::{CartRepository, MemoryStore, Repositories, StoreError, StoreResult};

/// Cart lines over a `MemoryStore` where the next lookup can be made to miss,
/// the way a second request sees the pair before the first one commits.
struct RacingCarts {
  inner: Arc<MemoryStore>,
  miss_next_lookup: AtomicBool,
  conflicts: AtomicUsize,
}

#[async_trait]
impl CartRepository for RacingCarts {
  async fn find_cart_line(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<Option<CartLine>> {
    if self.miss_next_lookup.swap(false, Ordering::SeqCst) {
      return Ok(None);
    }
    self.inner.find_cart_line(user_id, product_id).await
  }

  async fn insert_cart_line(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartLine> {
    let result = self.inner.insert_cart_line(user_id, product_id, quantity).await;
    if matches!(result, Err(StoreError::Conflict(_))) {
      self.conflicts.fetch_add(1, Ordering::SeqCst);
    }
    result
  }

  async fn increment_cart_line(&self, line_id: Uuid, by: i32) -> StoreResult<Option<CartLine>> {
    self.inner.increment_cart_line(line_id, by).await
  }

  async fn list_cart(&self, user_id: Uuid) -> StoreResult<Vec<CartLineView>> {
    self.inner.list_cart(user_id).await
  }

  async fn delete_owned_cart_line(&self, line_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    self.inner.delete_owned_cart_line(line_id, user_id).await
  }
}

#[actix_web::test]
async fn repeated_adds_increment_a_single_line() {
  let harness = Harness::without_payments();
  let app = init_app!(harness);
  let seller = Uuid::new_v4();
  let buyer = Uuid::new_v4();

  let req = test::TestRequest::post()
    .uri("/api/product/create-product")
    .insert_header(bearer(seller))
    .set_json(product_body("Desk Lamp", "lighting", 24.5))
    .to_request();
  let (status, created) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::CREATED);
  let product_id = id_of(&created["product"]["id"]);

  let mut first_line = None;
  for expected in 1..=3 {
    let req = test::TestRequest::post()
      .uri("/api/cart/add")
      .insert_header(bearer(buyer))
      .set_json(json!({ "productId": product_id }))
      .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartItem"]["quantity"], expected);
    let line_id = id_of(&body["cartItem"]["id"]);
    assert_eq!(*first_line.get_or_insert(line_id), line_id);
  }
  assert_eq!(harness.store.cart_line_count(), 1);

  let req = test::TestRequest::get()
    .uri("/api/cart/getCart")
    .insert_header(bearer(buyer))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::OK);
  let cart = body["cart"].as_array().unwrap();
  assert_eq!(cart.len(), 1);
  assert_eq!(cart[0]["quantity"], 3);
  assert_eq!(cart[0]["product"]["title"], "Desk Lamp");
  assert_eq!(cart[0]["product"]["price"], 24.5);
}

#[actix_web::test]
async fn concurrent_adds_are_all_counted() {
  let harness = Harness::without_payments();
  let app = init_app!(harness);
  let buyer = Uuid::new_v4();

  let req = test::TestRequest::post()
    .uri("/api/product/create-product")
    .insert_header(bearer(Uuid::new_v4()))
    .set_json(product_body("Mug", "kitchen", 9.0))
    .to_request();
  let (_, created) = read_json(test::call_service(&app, req).await).await;
  let product_id = id_of(&created["product"]["id"]);

  let requests = (0..5).map(|_| {
    let req = test::TestRequest::post()
      .uri("/api/cart/add")
      .insert_header(bearer(buyer))
      .set_json(json!({ "productId": product_id }))
      .to_request();
    test::call_service(&app, req)
  });
  for resp in join_all(requests).await {
    assert_eq!(resp.status(), StatusCode::OK);
  }

  let req = test::TestRequest::get()
    .uri("/api/cart/getCart")
    .insert_header(bearer(buyer))
    .to_request();
  let (_, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["cart"].as_array().unwrap().len(), 1);
  assert_eq!(body["cart"][0]["quantity"], 5);
}

#[actix_web::test]
async fn carts_are_private_to_their_owner() {
  let harness = Harness::without_payments();
  let app = init_app!(harness);
  let owner = Uuid::new_v4();
  let stranger = Uuid::new_v4();

  let req = test::TestRequest::post()
    .uri("/api/product/create-product")
    .insert_header(bearer(Uuid::new_v4()))
    .set_json(product_body("Chair", "furniture", 80.0))
    .to_request();
  let (_, created) = read_json(test::call_service(&app, req).await).await;
  let product_id = id_of(&created["product"]["id"]);

  let req = test::TestRequest::post()
    .uri("/api/cart/add")
    .insert_header(bearer(owner))
    .set_json(json!({ "productId": product_id }))
    .to_request();
  let (_, added) = read_json(test::call_service(&app, req).await).await;
  let line_id = id_of(&added["cartItem"]["id"]);

  let req = test::TestRequest::get()
    .uri("/api/cart/getCart")
    .insert_header(bearer(stranger))
    .to_request();
  let (_, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(body["cart"], json!([]));

  let req = test::TestRequest::delete()
    .uri(&format!("/api/cart/{}", line_id))
    .insert_header(bearer(stranger))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["status"], "fail");
  assert_eq!(harness.store.cart_line_count(), 1);

  let req = test::TestRequest::delete()
    .uri(&format!("/api/cart/{}", line_id))
    .insert_header(bearer(owner))
    .to_request();
  let (status, _) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(harness.store.cart_line_count(), 0);
}

#[actix_web::test]
async fn add_rejects_missing_or_unknown_products() {
  let harness = Harness::without_payments();
  let app = init_app!(harness);
  let buyer = Uuid::new_v4();

  let req = test::TestRequest::post()
    .uri("/api/cart/add")
    .insert_header(bearer(buyer))
    .set_json(json!({}))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Product ID is required");

  let req = test::TestRequest::post()
    .uri("/api/cart/add")
    .insert_header(bearer(buyer))
    .set_json(json!({ "productId": Uuid::new_v4() }))
    .to_request();
  let (status, _) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(harness.store.cart_line_count(), 0);
}

#[actix_web::test]
async fn cart_routes_require_a_session() {
  let harness = Harness::without_payments();
  let app = init_app!(harness);

  let req = test::TestRequest::get().uri("/api/cart/getCart").to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["status"], "fail");

  let req = test::TestRequest::get()
    .uri("/api/cart/getCart")
    .insert_header((actix_web::http::header::AUTHORIZATION, "Bearer not-a-jwt"))
    .to_request();
  let (status, _) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::get()
    .uri("/api/cart/getCart")
    .cookie(actix_web::cookie::Cookie::new("jwt", token_for(Uuid::new_v4(), None)))
    .to_request();
  let (status, _) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn insert_conflict_falls_back_to_increment() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let carts = Arc::new(RacingCarts {
    inner: store.clone(),
    miss_next_lookup: AtomicBool::new(false),
    conflicts: AtomicUsize::new(0),
  });
  let mut repos = Repositories::shared(store.clone());
  repos.carts = carts.clone();

  let mut gateway = MockPaymentGateway::new();
  gateway.expect_create_checkout_session().never();
  let harness = Harness {
    state: AppState::new(test_config(&[]), repos, Arc::new(gateway)),
    store,
  };
  let app = init_app!(harness);
  let buyer = Uuid::new_v4();

  let req = test::TestRequest::post()
    .uri("/api/product/create-product")
    .insert_header(bearer(Uuid::new_v4()))
    .set_json(product_body("Lamp Shade", "lighting", 14.0))
    .to_request();
  let (_, created) = read_json(test::call_service(&app, req).await).await;
  let product_id = id_of(&created["product"]["id"]);

  let mut line_ids = Vec::new();
  for call in 1..=4 {
    // Every add after the first misses the existing line and hits the unique pair.
    carts.miss_next_lookup.store(call > 1, Ordering::SeqCst);
    let req = test::TestRequest::post()
      .uri("/api/cart/add")
      .insert_header(bearer(buyer))
      .set_json(json!({ "productId": product_id }))
      .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartItem"]["quantity"], call);
    line_ids.push(id_of(&body["cartItem"]["id"]));
  }

  assert_eq!(carts.conflicts.load(Ordering::SeqCst), 3);
  assert!(line_ids.iter().all(|id| *id == line_ids[0]));
  assert_eq!(harness.store.cart_line_count(), 1);
}
