// server/tests/common/mod.rs
#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test;
use jsonwebtoken::{encode, EncodingKey, Header};
use once_cell::sync::Lazy;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use storefront_server::config::AppConfig;
use storefront_server::services::payment_gateway::MockPaymentGateway;
use storefront_server::services::Claims;
use storefront_server::state::AppState;
use storefront_server::store::memory::MemoryStore;
use storefront_server::store::Repositories;

pub const JWT_SECRET: &str = "integration-test-secret";

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_env_filter("storefront_server=debug,storefront_flow=debug")
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config(overrides: &[(&str, &str)]) -> AppConfig {
  let mut vars: HashMap<String, String> = [
    ("DATABASE_URL", "postgres://unused/storefront"),
    ("JWT_SECRET", JWT_SECRET),
    ("STRIPE_SECRET_KEY", "sk_test_unused"),
  ]
  .iter()
  .map(|(k, v)| (k.to_string(), v.to_string()))
  .collect();
  for (k, v) in overrides {
    vars.insert(k.to_string(), v.to_string());
  }
  AppConfig::from_lookup(|name| vars.get(name).cloned()).expect("test config should load")
}

/// Application state over an in-memory store, plus a handle to that store.
pub struct Harness {
  pub state: AppState,
  pub store: Arc<MemoryStore>,
}

impl Harness {
  pub fn new(gateway: MockPaymentGateway) -> Self {
    Self::with_config(test_config(&[]), gateway)
  }

  pub fn with_config(config: AppConfig, gateway: MockPaymentGateway) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(config, Repositories::shared(store.clone()), Arc::new(gateway));
    Self { state, store }
  }

  /// A harness whose payment gateway must never be called.
  pub fn without_payments() -> Self {
    let mut gateway = MockPaymentGateway::new();
    gateway.expect_create_checkout_session().never();
    Self::new(gateway)
  }
}

/// Builds the full route tree over a harness's state.
#[macro_export]
macro_rules! init_app {
  ($harness:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($harness.state.clone()))
        .configure(storefront_server::web::configure_app),
    )
    .await
  };
}

pub fn token_for(user_id: Uuid, role: Option<&str>) -> String {
  let claims = Claims {
    id: user_id,
    role: role.map(str::to_string),
    exp: (chrono::Utc::now().timestamp() + 3600) as usize,
  };
  encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).expect("token should encode")
}

pub fn bearer(user_id: Uuid) -> (actix_web::http::header::HeaderName, String) {
  (
    actix_web::http::header::AUTHORIZATION,
    format!("Bearer {}", token_for(user_id, Some("user"))),
  )
}

/// Status and parsed body. Empty bodies come back as `null`.
pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> (StatusCode, Json) {
  let status = resp.status();
  let bytes = test::read_body(resp).await;
  let body = if bytes.is_empty() {
    Json::Null
  } else {
    serde_json::from_slice(&bytes).expect("response body should be JSON")
  };
  (status, body)
}

pub fn product_body(title: &str, category: &str, price: f64) -> Json {
  serde_json::json!({
    "title": title,
    "description": format!("{} description", title),
    "price": price,
    "category": category,
  })
}

pub fn id_of(value: &Json) -> Uuid {
  value
    .as_str()
    .and_then(|s| Uuid::parse_str(s).ok())
    .expect("value should be a UUID string")
}
