// server/src/pipelines/checkout_pipeline.rs

use std::sync::Arc;
use storefront_flow::{Control, Flow, Registry, Shared, SkipCondition};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::CheckoutSessionCtx;
use crate::services::CheckoutSessionRequest;

const MODES: [&str; 3] = ["payment", "subscription", "setup"];

fn validate_request(request: &CheckoutSessionRequest) -> Result<(), AppError> {
  let invalid = |m: &str| Err(AppError::Validation(m.to_string()));

  if request.line_items.is_empty() {
    return invalid("At least one line item is required");
  }
  for item in &request.line_items {
    if item.quantity < 1 {
      return invalid("Line item quantity must be at least 1");
    }
    let has_price = item.price.as_deref().is_some_and(|p| !p.trim().is_empty());
    match (&item.price_data, has_price) {
      (None, false) => return invalid("Each line item needs a price or price_data"),
      (Some(data), _) => {
        if data.currency.trim().is_empty() {
          return invalid("price_data.currency is required");
        }
        let tagged = data.product_data.as_ref().and_then(|p| p.product_id()).is_some();
        match data.unit_amount {
          Some(amount) if amount < 0 => return invalid("price_data.unit_amount must not be negative"),
          None if !tagged => return invalid("price_data.unit_amount is required"),
          _ => {}
        }
      }
      (None, true) => {}
    }
  }
  if !MODES.contains(&request.mode.as_str()) {
    return invalid("mode must be one of payment, subscription or setup");
  }
  if request.success_url.trim().is_empty() || request.cancel_url.trim().is_empty() {
    return invalid("success_url and cancel_url are required");
  }
  Ok(())
}

fn has_tagged_products(request: &CheckoutSessionRequest) -> bool {
  request.line_items.iter().any(|item| {
    item
      .price_data
      .as_ref()
      .and_then(|d| d.product_data.as_ref())
      .and_then(|p| p.product_id())
      .is_some()
  })
}

/// Minor currency units for a stored price.
fn to_minor_units(price: f64) -> i64 {
  (price * 100.0).round() as i64
}

pub fn register_checkout_session_pipeline(registry: &Registry<AppError>) {
  let nothing_to_reprice: SkipCondition<CheckoutSessionCtx> =
    Arc::new(|ctx: Shared<CheckoutSessionCtx>| !has_tagged_products(&ctx.read().request));

  let mut p = Flow::<CheckoutSessionCtx, AppError>::new(
    "checkout_session",
    &[
      ("validate_checkout_request", false, None),
      ("reprice_line_items", true, Some(nothing_to_reprice)),
      ("create_hosted_session", false, None),
    ],
  );

  p.on("validate_checkout_request", |ctx: Shared<CheckoutSessionCtx>| async move {
    let checked = validate_request(&ctx.read().request);
    if let Err(e) = &checked {
      warn!(error = %e, "Checkout: request rejected.");
    }
    checked.map(|_| Control::Continue)
  });

  // Line items tagged with a stored product are charged at the stored price.
  p.on("reprice_line_items", |ctx: Shared<CheckoutSessionCtx>| async move {
    let (tagged, repos) = {
      let guard = ctx.read();
      let tagged: Vec<(usize, uuid::Uuid)> = guard
        .request
        .line_items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
          item
            .price_data
            .as_ref()
            .and_then(|d| d.product_data.as_ref())
            .and_then(|p| p.product_id())
            .map(|id| (i, id))
        })
        .collect();
      (tagged, guard.app_state.repos.clone())
    };

    let mut amounts = Vec::with_capacity(tagged.len());
    for (index, product_id) in tagged {
      match repos.products.get_product(product_id).await? {
        Some(product) => amounts.push((index, to_minor_units(product.price))),
        // Unknown products keep the client amount when one was sent.
        None => {
          let client_amount = ctx.with(|c| {
            c.request.line_items[index]
              .price_data
              .as_ref()
              .and_then(|d| d.unit_amount)
          });
          if client_amount.is_none() {
            return Err(AppError::NotFound("No product found with that ID".to_string()));
          }
          warn!(%product_id, "Checkout: tagged product not found, keeping client amount.");
        }
      }
    }

    let mut guard = ctx.write();
    for (index, amount) in amounts {
      if let Some(data) = guard.request.line_items[index].price_data.as_mut() {
        data.unit_amount = Some(amount);
      }
    }
    Ok::<_, AppError>(Control::Continue)
  });

  p.on("create_hosted_session", |ctx: Shared<CheckoutSessionCtx>| async move {
    let (request, gateway) = {
      let guard = ctx.read();
      (guard.request.clone(), guard.app_state.payments.clone())
    };

    let session = gateway.create_checkout_session(&request).await?;
    info!(session_id = %session.id, "Checkout: hosted session created.");
    ctx.write().session = Some(session);
    Ok::<_, AppError>(Control::Continue)
  });

  registry.register(p);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::payment_gateway::{LineItem, PriceData};

  fn request() -> CheckoutSessionRequest {
    CheckoutSessionRequest {
      line_items: vec![LineItem {
        price: None,
        price_data: Some(PriceData {
          currency: "usd".into(),
          unit_amount: Some(1500),
          product_data: None,
        }),
        quantity: 1,
      }],
      mode: "payment".into(),
      success_url: "https://shop.example/success".into(),
      cancel_url: "https://shop.example/cancel".into(),
      customer_email: None,
      metadata: None,
    }
  }

  #[test]
  fn well_formed_request_passes() {
    assert!(validate_request(&request()).is_ok());
  }

  #[test]
  fn malformed_requests_are_rejected() {
    let mut empty = request();
    empty.line_items.clear();
    assert!(validate_request(&empty).is_err());

    let mut zero_qty = request();
    zero_qty.line_items[0].quantity = 0;
    assert!(validate_request(&zero_qty).is_err());

    let mut bad_mode = request();
    bad_mode.mode = "donation".into();
    assert!(validate_request(&bad_mode).is_err());

    let mut no_url = request();
    no_url.cancel_url = " ".into();
    assert!(validate_request(&no_url).is_err());

    let mut no_amount = request();
    no_amount.line_items[0].price_data.as_mut().unwrap().unit_amount = None;
    assert!(validate_request(&no_amount).is_err());
  }

  #[test]
  fn prices_round_to_minor_units() {
    assert_eq!(to_minor_units(19.99), 1999);
    assert_eq!(to_minor_units(0.1 + 0.2), 30);
    assert_eq!(to_minor_units(5.0), 500);
  }
}
