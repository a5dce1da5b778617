// server/src/services/payment_gateway.rs

//! Hosted checkout sessions. [`StripeGateway`] talks to the Stripe API;
//! tests use the generated `MockPaymentGateway`.

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum PaymentError {
  #[error("request to payment provider failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("payment provider rejected the request: {0}")]
  Rejected(String),

  #[error("unexpected response from payment provider: {0}")]
  InvalidResponse(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductData {
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub images: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<BTreeMap<String, Json>>,
}

impl ProductData {
  /// The stored product this line item refers to, if the client tagged one.
  pub fn product_id(&self) -> Option<uuid::Uuid> {
    self
      .metadata
      .as_ref()?
      .get("productId")?
      .as_str()
      .and_then(|raw| uuid::Uuid::parse_str(raw).ok())
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
  #[serde(default)]
  pub currency: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub unit_amount: Option<i64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub product_data: Option<ProductData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub price: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub price_data: Option<PriceData>,
  #[serde(default)]
  pub quantity: i64,
}

/// Body of `create-checkout-session`, forwarded to the provider after validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSessionRequest {
  #[serde(default)]
  pub line_items: Vec<LineItem>,
  #[serde(default)]
  pub mode: String,
  #[serde(default)]
  pub success_url: String,
  #[serde(default)]
  pub cancel_url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer_email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<BTreeMap<String, Json>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
  pub id: String,
  pub url: Option<String>,
}

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Creates a hosted checkout session and returns its id and redirect URL.
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, PaymentError>;
}

pub struct StripeGateway {
  client: reqwest::Client,
  api_base: String,
  secret_key: String,
}

impl StripeGateway {
  pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
    Self {
      client: reqwest::Client::new(),
      api_base: api_base.into(),
      secret_key: secret_key.into(),
    }
  }
}

#[derive(Deserialize)]
struct StripeErrorBody {
  error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
  message: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  #[instrument(name = "stripe::create_checkout_session", skip_all, fields(line_items = request.line_items.len(), mode = %request.mode))]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession, PaymentError> {
    let form = session_form(request)?;
    let url = format!("{}/v1/checkout/sessions", self.api_base);

    let response = self
      .client
      .post(&url)
      .bearer_auth(&self.secret_key)
      .form(&form)
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      let message = serde_json::from_str::<StripeErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| status.to_string());
      warn!(%status, %message, "Stripe rejected checkout session.");
      return Err(PaymentError::Rejected(message));
    }

    let session = response
      .json::<CheckoutSession>()
      .await
      .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;
    info!(session_id = %session.id, "Checkout session created.");
    Ok(session)
  }
}

/// The provider form for a session request: card payments plus the request fields.
pub fn session_form(request: &CheckoutSessionRequest) -> Result<Vec<(String, String)>, PaymentError> {
  let mut body = match serde_json::to_value(request) {
    Ok(Json::Object(map)) => map,
    Ok(_) => Map::new(),
    Err(e) => return Err(PaymentError::InvalidResponse(e.to_string())),
  };
  body.insert("payment_method_types".to_string(), Json::Array(vec![Json::String("card".to_string())]));
  Ok(flatten_form(&Json::Object(body)))
}

/// Flattens JSON into bracketed form keys: `a[b][0]=c`. Nulls are dropped.
pub fn flatten_form(value: &Json) -> Vec<(String, String)> {
  let mut pairs = Vec::new();
  flatten_into(None, value, &mut pairs);
  pairs
}

fn flatten_into(prefix: Option<String>, value: &Json, pairs: &mut Vec<(String, String)>) {
  let key = |child: &str| match &prefix {
    Some(p) => format!("{}[{}]", p, child),
    None => child.to_string(),
  };
  match value {
    Json::Null => {}
    Json::Object(map) => {
      for (k, v) in map {
        flatten_into(Some(key(k)), v, pairs);
      }
    }
    Json::Array(items) => {
      for (i, v) in items.iter().enumerate() {
        flatten_into(Some(key(&i.to_string())), v, pairs);
      }
    }
    Json::String(s) => {
      if let Some(p) = &prefix {
        pairs.push((p.clone(), s.clone()));
      }
    }
    Json::Bool(b) => {
      if let Some(p) = &prefix {
        pairs.push((p.clone(), b.to_string()));
      }
    }
    Json::Number(n) => {
      if let Some(p) = &prefix {
        pairs.push((p.clone(), n.to_string()));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn nested_values_get_bracketed_keys() {
    let pairs = flatten_form(&json!({
      "mode": "payment",
      "line_items": [{"quantity": 2, "price_data": {"currency": "usd", "unit_amount": 1999}}],
      "metadata": {"cart": "abc", "gift": true, "note": null}
    }));
    assert!(pairs.contains(&("mode".into(), "payment".into())));
    assert!(pairs.contains(&("line_items[0][quantity]".into(), "2".into())));
    assert!(pairs.contains(&("line_items[0][price_data][currency]".into(), "usd".into())));
    assert!(pairs.contains(&("line_items[0][price_data][unit_amount]".into(), "1999".into())));
    assert!(pairs.contains(&("metadata[gift]".into(), "true".into())));
    assert!(!pairs.iter().any(|(k, _)| k == "metadata[note]"));
  }

  #[test]
  fn session_form_requests_card_payments() {
    let request = CheckoutSessionRequest {
      line_items: vec![LineItem {
        price: Some("price_123".into()),
        price_data: None,
        quantity: 1,
      }],
      mode: "payment".into(),
      success_url: "https://shop.example/ok".into(),
      cancel_url: "https://shop.example/cancel".into(),
      customer_email: None,
      metadata: None,
    };
    let form = session_form(&request).unwrap();
    assert!(form.contains(&("payment_method_types[0]".into(), "card".into())));
    assert!(form.contains(&("line_items[0][price]".into(), "price_123".into())));
    assert!(!form.iter().any(|(k, _)| k == "customer_email"));
  }

  #[test]
  fn product_id_is_read_from_metadata() {
    let id = uuid::Uuid::new_v4();
    let data = ProductData {
      name: "Lamp".into(),
      metadata: Some(BTreeMap::from([("productId".to_string(), json!(id.to_string()))])),
      ..ProductData::default()
    };
    assert_eq!(data.product_id(), Some(id));
    assert_eq!(ProductData::default().product_id(), None);
  }
}
