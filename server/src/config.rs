// server/src/config.rs

use crate::errors::{AppError, Result};
use crate::models::order::PaymentStatus;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// One year.
pub const MAX_DEDUP_WINDOW_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  /// HS256 secret shared with whatever issues session tokens.
  pub jwt_secret: String,

  pub stripe_secret_key: String,
  pub stripe_api_base: String,

  /// Trailing window inside which a repeat order for the same product is a replay.
  pub order_dedup_window_secs: i64,
  pub order_initial_payment_status: PaymentStatus,

  pub cors_allowed_origins: Vec<String>,
  pub run_migrations: bool,
  pub log_format: LogFormat,
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from any variable source. Secrets are never logged.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let required = |name: &str| {
      lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)))
    };
    let or_default = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

    let server_host = or_default("SERVER_HOST", "127.0.0.1");
    let server_port = parse_var::<u16>("SERVER_PORT", &or_default("SERVER_PORT", "8080"))?;
    let database_url = required("DATABASE_URL")?;
    let jwt_secret = required("JWT_SECRET")?;
    let stripe_secret_key = required("STRIPE_SECRET_KEY")?;
    let stripe_api_base = or_default("STRIPE_API_BASE", "https://api.stripe.com")
      .trim_end_matches('/')
      .to_string();

    let order_dedup_window_secs =
      parse_var::<i64>("ORDER_DEDUP_WINDOW_SECS", &or_default("ORDER_DEDUP_WINDOW_SECS", "300"))?;
    if !(0..=MAX_DEDUP_WINDOW_SECS).contains(&order_dedup_window_secs) {
      return Err(AppError::Config(format!(
        "ORDER_DEDUP_WINDOW_SECS must be between 0 and {}",
        MAX_DEDUP_WINDOW_SECS
      )));
    }
    let order_initial_payment_status = parse_var::<PaymentStatus>(
      "ORDER_INITIAL_PAYMENT_STATUS",
      &or_default("ORDER_INITIAL_PAYMENT_STATUS", "paid"),
    )?;

    let cors_allowed_origins = or_default("CORS_ALLOWED_ORIGINS", "http://localhost:5173")
      .split(',')
      .map(str::trim)
      .filter(|o| !o.is_empty())
      .map(str::to_string)
      .collect();

    let run_migrations = parse_var::<bool>("RUN_MIGRATIONS", &or_default("RUN_MIGRATIONS", "false"))?;

    let log_format = match or_default("LOG_FORMAT", "pretty").trim().to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      "pretty" | "compact" | "" => LogFormat::Pretty,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      jwt_secret,
      stripe_secret_key,
      stripe_api_base,
      order_dedup_window_secs,
      order_initial_payment_status,
      cors_allowed_origins,
      run_migrations,
      log_format,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name| map.get(name).cloned()
  }

  const REQUIRED: [(&str, &str); 3] = [
    ("DATABASE_URL", "postgres://localhost/storefront"),
    ("JWT_SECRET", "secret"),
    ("STRIPE_SECRET_KEY", "sk_test_123"),
  ];

  #[test]
  fn defaults_apply_when_only_required_values_are_set() {
    let config = AppConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
    assert_eq!(config.server_host, "127.0.0.1");
    assert_eq!(config.server_port, 8080);
    assert_eq!(config.stripe_api_base, "https://api.stripe.com");
    assert_eq!(config.order_dedup_window_secs, 300);
    assert_eq!(config.order_initial_payment_status, PaymentStatus::Paid);
    assert_eq!(config.cors_allowed_origins, vec!["http://localhost:5173".to_string()]);
    assert!(!config.run_migrations);
    assert_eq!(config.log_format, LogFormat::Pretty);
  }

  #[test]
  fn missing_secret_is_a_config_error() {
    let result = AppConfig::from_lookup(lookup_from(&REQUIRED[..2]));
    assert!(matches!(result, Err(AppError::Config(m)) if m.contains("STRIPE_SECRET_KEY")));
  }

  #[test]
  fn overrides_are_parsed() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend([
      ("SERVER_PORT", "9000"),
      ("ORDER_DEDUP_WINDOW_SECS", "60"),
      ("ORDER_INITIAL_PAYMENT_STATUS", "pending"),
      ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
      ("STRIPE_API_BASE", "http://127.0.0.1:12111/"),
      ("LOG_FORMAT", "json"),
      ("RUN_MIGRATIONS", "true"),
    ]);
    let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(config.server_port, 9000);
    assert_eq!(config.order_dedup_window_secs, 60);
    assert_eq!(config.order_initial_payment_status, PaymentStatus::Pending);
    assert_eq!(config.cors_allowed_origins.len(), 2);
    assert_eq!(config.stripe_api_base, "http://127.0.0.1:12111");
    assert_eq!(config.log_format, LogFormat::Json);
    assert!(config.run_migrations);
  }

  #[test]
  fn dedup_window_of_one_year_is_accepted() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("ORDER_DEDUP_WINDOW_SECS", "31536000"));
    let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(config.order_dedup_window_secs, MAX_DEDUP_WINDOW_SECS);
  }

  #[test]
  fn bad_values_are_rejected() {
    for (name, value) in [
      ("SERVER_PORT", "eighty"),
      ("ORDER_DEDUP_WINDOW_SECS", "-5"),
      ("ORDER_DEDUP_WINDOW_SECS", "9223372036854775"),
      ("ORDER_DEDUP_WINDOW_SECS", "31536001"),
      ("ORDER_INITIAL_PAYMENT_STATUS", "refunded"),
      ("LOG_FORMAT", "xml"),
    ] {
      let mut pairs = REQUIRED.to_vec();
      pairs.push((name, value));
      assert!(
        matches!(AppConfig::from_lookup(lookup_from(&pairs)), Err(AppError::Config(_))),
        "{} = {} should fail",
        name,
        value
      );
    }
  }
}
