// server/tests/payment_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::*;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use storefront_server::services::payment_gateway::{MockPaymentGateway, PaymentError};
use storefront_server::services::{CheckoutSession, CheckoutSessionRequest};

fn recording_gateway(seen: Arc<Mutex<Vec<CheckoutSessionRequest>>>) -> MockPaymentGateway {
  let mut gateway = MockPaymentGateway::new();
  gateway.expect_create_checkout_session().times(1).returning(move |request| {
    seen.lock().push(request.clone());
    Ok(CheckoutSession {
      id: "cs_test_123".to_string(),
      url: Some("https://checkout.stripe.com/c/pay/cs_test_123".to_string()),
    })
  });
  gateway
}

fn line_item(name: &str, unit_amount: Option<i64>, product_id: Option<Uuid>) -> serde_json::Value {
  let mut product_data = json!({ "name": name });
  if let Some(id) = product_id {
    product_data["metadata"] = json!({ "productId": id });
  }
  let mut price_data = json!({ "currency": "usd", "product_data": product_data });
  if let Some(amount) = unit_amount {
    price_data["unit_amount"] = json!(amount);
  }
  json!({ "price_data": price_data, "quantity": 2 })
}

fn session_body(line_items: Vec<serde_json::Value>) -> serde_json::Value {
  json!({
    "line_items": line_items,
    "mode": "payment",
    "success_url": "https://shop.example/success",
    "cancel_url": "https://shop.example/cancel",
  })
}

#[actix_web::test]
async fn tagged_line_items_are_charged_the_stored_price() {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let harness = Harness::new(recording_gateway(seen.clone()));
  let app = init_app!(harness);

  let req = test::TestRequest::post()
    .uri("/api/product/create-product")
    .insert_header(bearer(Uuid::new_v4()))
    .set_json(product_body("Backpack", "bags", 19.99))
    .to_request();
  let (_, created) = read_json(test::call_service(&app, req).await).await;
  let product_id = id_of(&created["product"]["id"]);

  let body = session_body(vec![
    line_item("Backpack", Some(1), Some(product_id)),
    line_item("Gift wrap", Some(350), None),
  ]);
  let req = test::TestRequest::post()
    .uri("/api/payment/create-checkout-session")
    .set_json(body)
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!({ "id": "cs_test_123", "url": "https://checkout.stripe.com/c/pay/cs_test_123" })
  );

  let seen = seen.lock();
  assert_eq!(seen.len(), 1);
  let amounts: Vec<Option<i64>> = seen[0]
    .line_items
    .iter()
    .map(|item| item.price_data.as_ref().and_then(|d| d.unit_amount))
    .collect();
  assert_eq!(amounts, vec![Some(1999), Some(350)]);
  assert_eq!(seen[0].line_items[0].quantity, 2);
}

#[actix_web::test]
async fn tagged_item_without_amount_needs_a_stored_product() {
  let mut gateway = MockPaymentGateway::new();
  gateway.expect_create_checkout_session().never();
  let harness = Harness::new(gateway);
  let app = init_app!(harness);

  let req = test::TestRequest::post()
    .uri("/api/payment/create-checkout-session")
    .set_json(session_body(vec![line_item("Ghost", None, Some(Uuid::new_v4()))]))
    .to_request();
  let (status, _) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn malformed_sessions_never_reach_the_provider() {
  let harness = Harness::without_payments();
  let app = init_app!(harness);

  let mut bad_mode = session_body(vec![line_item("Pen", Some(100), None)]);
  bad_mode["mode"] = json!("donation");
  let mut no_amount = session_body(vec![line_item("Pen", None, None)]);
  no_amount["cancel_url"] = json!("https://shop.example/cancel");

  for body in [
    session_body(vec![]),
    bad_mode,
    no_amount,
    json!({ "line_items": [line_item("Pen", Some(100), None)], "mode": "payment" }),
  ] {
    let req = test::TestRequest::post()
      .uri("/api/payment/create-checkout-session")
      .set_json(body)
      .to_request();
    let (status, body) = read_json(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
  }
}

#[actix_web::test]
async fn provider_failure_is_a_bad_gateway() {
  let mut gateway = MockPaymentGateway::new();
  gateway
    .expect_create_checkout_session()
    .times(1)
    .returning(|_| Err(PaymentError::Rejected("Invalid API Key provided".to_string())));
  let harness = Harness::new(gateway);
  let app = init_app!(harness);

  let req = test::TestRequest::post()
    .uri("/api/payment/create-checkout-session")
    .set_json(session_body(vec![line_item("Pen", Some(100), None)]))
    .to_request();
  let (status, body) = read_json(test::call_service(&app, req).await).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert_eq!(body["status"], "error");
  assert_eq!(body["message"], "Failed to create checkout session");
}
