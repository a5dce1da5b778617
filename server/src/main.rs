// server/src/main.rs

use actix_cors::Cors;
use actix_web::{http::header, web as actix_data, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use storefront_server::config::{AppConfig, LogFormat};
use storefront_server::services::StripeGateway;
use storefront_server::state::AppState;
use storefront_server::store::Repositories;
use storefront_server::web::configure_app;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let app_config = AppConfig::from_env().context("failed to load configuration")?;
  init_tracing(app_config.log_format);

  tracing::info!(
    host = %app_config.server_host,
    port = app_config.server_port,
    dedup_window_secs = app_config.order_dedup_window_secs,
    "Starting storefront server..."
  );

  let db_pool = PgPoolOptions::new()
    .max_connections(10)
    .connect(&app_config.database_url)
    .await
    .context("failed to connect to the database")?;
  tracing::info!("Connected to the database.");

  if app_config.run_migrations {
    sqlx::migrate!("./migrations")
      .run(&db_pool)
      .await
      .context("failed to run migrations")?;
    tracing::info!("Database migrations applied.");
  }

  let payments = Arc::new(StripeGateway::new(
    app_config.stripe_api_base.clone(),
    app_config.stripe_secret_key.clone(),
  ));
  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let allowed_origins = app_config.cors_allowed_origins.clone();
  let app_state = AppState::new(app_config, Repositories::postgres(db_pool), payments);

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    let cors = allowed_origins
      .iter()
      .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
      .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
      .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
      .supports_credentials()
      .max_age(3600);

    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(cors)
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app)
  })
  .bind(&server_address)
  .with_context(|| format!("failed to bind {}", server_address))?
  .run()
  .await?;

  Ok(())
}
