use crate::config::AppConfig;
use crate::services::gateway::PaymentGateway;
use crate::services::notifier::Notifier;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub config: Arc<AppConfig>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub notifier: Notifier,
}
