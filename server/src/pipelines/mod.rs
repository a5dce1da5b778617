// server/src/pipelines/mod.rs

//! Step pipelines for the cart, order and checkout coordinators.

use crate::errors::AppError;
use storefront_flow::Registry;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod contexts;
pub mod order_pipeline;

/// Registers every coordinator pipeline. Called once while building `AppState`.
pub fn register_all_pipelines(registry: &Registry<AppError>) {
  tracing::info!("Registering coordinator pipelines...");

  cart_pipeline::register_add_to_cart_pipeline(registry);
  order_pipeline::register_create_order_pipeline(registry);
  checkout_pipeline::register_checkout_session_pipeline(registry);

  tracing::info!("All coordinator pipelines registered.");
}
