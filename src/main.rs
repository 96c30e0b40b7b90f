mod config;
mod errors;
mod models;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::services::gateway::{MercadoPagoGateway, PaymentGateway, UnconfiguredGateway};
use crate::services::notifier::{LogMailer, Notifier};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting AromaZen backend server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  // Without an access token checkout fails with GatewayConfig but the
  // catalog, blog and auth endpoints still work.
  let gateway: Arc<dyn PaymentGateway> = match MercadoPagoGateway::from_config(&app_config) {
    Ok(gw) => Arc::new(gw),
    Err(e) => {
      tracing::warn!(error = %e, "Payment gateway not configured; checkout will be unavailable.");
      Arc::new(UnconfiguredGateway)
    }
  };

  let notifier = Notifier::spawn(Arc::new(LogMailer), app_config.email_sender.clone());

  let app_state = AppState {
    db_pool,
    config: app_config.clone(),
    gateway,
    notifier,
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      // Malformed bodies/paths/query strings answer with the same JSON error
      // shape as application errors.
      .app_data(actix_data::JsonConfig::default().error_handler(errors::json_payload_error_handler))
      .app_data(actix_data::QueryConfig::default().error_handler(errors::query_payload_error_handler))
      .app_data(actix_data::PathConfig::default().error_handler(errors::path_error_handler))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::routes::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
