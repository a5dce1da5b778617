// server/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::{PaymentGateway, SessionVerifier};
use crate::store::Repositories;
use std::sync::Arc;
use storefront_flow::Registry;

#[derive(Clone)]
pub struct AppState {
  pub repos: Repositories,
  pub flows: Arc<Registry<AppError>>,
  pub config: Arc<AppConfig>,
  pub sessions: Arc<SessionVerifier>,
  pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
  /// Builds the shared state and registers every coordinator pipeline.
  pub fn new(config: AppConfig, repos: Repositories, payments: Arc<dyn PaymentGateway>) -> Self {
    let flows = Arc::new(Registry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);

    Self {
      repos,
      flows,
      sessions: Arc::new(SessionVerifier::new(&config.jwt_secret)),
      config: Arc::new(config),
      payments,
    }
  }
}
