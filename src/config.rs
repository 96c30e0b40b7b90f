use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,

  // Payment gateway (MercadoPago-style REST API).
  pub mp_access_token: Option<String>,
  pub mp_api_base_url: String,
  pub checkout_success_url: String,
  pub checkout_failure_url: String,
  pub checkout_pending_url: String,
  pub currency_code: String,

  pub email_sender: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Internal(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Internal(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

    // The access token is optional at startup so that catalog-only deployments
    // still boot; checkout fails with GatewayConfig if it is absent.
    let mp_access_token = env::var("MP_ACCESS_TOKEN").ok();
    let mp_api_base_url = get_env("MP_API_BASE_URL").unwrap_or_else(|_| "https://api.mercadopago.com".to_string());
    let checkout_success_url = get_env("CHECKOUT_SUCCESS_URL").unwrap_or_else(|_| format!("{}/success", app_base_url));
    let checkout_failure_url = get_env("CHECKOUT_FAILURE_URL").unwrap_or_else(|_| format!("{}/failure", app_base_url));
    let checkout_pending_url = get_env("CHECKOUT_PENDING_URL").unwrap_or_else(|_| format!("{}/pending", app_base_url));
    let currency_code = get_env("CURRENCY_CODE").unwrap_or_else(|_| "ARS".to_string());

    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "noreply@aromazen.example".to_string());

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      mp_access_token,
      mp_api_base_url,
      checkout_success_url,
      checkout_failure_url,
      checkout_pending_url,
      currency_code,
      email_sender,
    })
  }

  /// URL the gateway pushes payment notifications to.
  pub fn notification_url(&self) -> String {
    format!("{}/api/productos/webhook/mercadopago", self.app_base_url)
  }
}
