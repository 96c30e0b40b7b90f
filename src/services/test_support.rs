//! Shared fixtures for the database-backed tests: schema setup, row seeding,
//! an `AppState` builder and a scriptable gateway double.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::User;
use crate::services::gateway::{PaymentGateway, PaymentInfo, Preference, PreferenceRequest};
use crate::services::notifier::{LogMailer, Notifier};
use crate::state::AppState;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Applies schema.sql to the per-test database `#[sqlx::test]` provisioned.
pub async fn apply_schema(pool: &PgPool) {
  sqlx::raw_sql(include_str!("../../schema.sql"))
    .execute(pool)
    .await
    .expect("schema.sql should apply cleanly");
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".into(),
    server_port: 8080,
    database_url: "unused".into(),
    app_base_url: "http://127.0.0.1:8080".into(),
    mp_access_token: None,
    mp_api_base_url: "https://api.mercadopago.example".into(),
    checkout_success_url: "http://127.0.0.1:8080/success".into(),
    checkout_failure_url: "http://127.0.0.1:8080/failure".into(),
    checkout_pending_url: "http://127.0.0.1:8080/pending".into(),
    currency_code: "ARS".into(),
    email_sender: "noreply@aromazen.example".into(),
  }
}

pub fn state_with_gateway(pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> AppState {
  AppState {
    db_pool: pool,
    config: Arc::new(test_config()),
    gateway,
    notifier: Notifier::spawn(Arc::new(LogMailer), "noreply@aromazen.example".to_string()),
  }
}

pub async fn seed_user(pool: &PgPool, username: &str, is_staff: bool) -> User {
  sqlx::query_as(
    "INSERT INTO users (id, username, email, password_hash, is_staff) VALUES ($1, $2, $3, 'not-a-real-hash', $4) \
     RETURNING id, username, email, password_hash, first_name, last_name, is_staff, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(username)
  .bind(format!("{}@example.com", username))
  .bind(is_staff)
  .fetch_one(pool)
  .await
  .expect("user insert")
}

pub async fn seed_product(pool: &PgPool, name: &str, stock: i32, price: Decimal) -> Uuid {
  let id = Uuid::new_v4();
  sqlx::query("INSERT INTO products (id, name, price, stock, description) VALUES ($1, $2, $3, $4, 'Aroma de prueba')")
    .bind(id)
    .bind(name)
    .bind(price)
    .bind(stock)
    .execute(pool)
    .await
    .expect("product insert");
  id
}

pub async fn count_rows(pool: &PgPool, table: &str) -> i64 {
  sqlx::query_scalar(&format!("SELECT count(*) FROM {}", table))
    .fetch_one(pool)
    .await
    .expect("count")
}

pub async fn product_stock(pool: &PgPool, product_id: Uuid) -> i32 {
  sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_one(pool)
    .await
    .expect("stock lookup")
}

/// Gateway double: preference creation succeeds (or always fails, for the
/// rollback tests) and payment lookup replays whatever was scripted.
#[derive(Default)]
pub struct StubGateway {
  fail_preference: bool,
  payment: Mutex<Option<PaymentInfo>>,
}

impl StubGateway {
  pub fn failing() -> Self {
    Self {
      fail_preference: true,
      payment: Mutex::new(None),
    }
  }

  pub fn set_payment(&self, payment: PaymentInfo) {
    *self.payment.lock().unwrap() = Some(payment);
  }
}

#[async_trait]
impl PaymentGateway for StubGateway {
  async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference> {
    if self.fail_preference {
      return Err(AppError::GatewayRejected("provider unavailable".to_string()));
    }
    Ok(Preference {
      id: format!("pref-{}", request.external_reference),
      init_point: "https://mp.example/init".to_string(),
    })
  }

  async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo> {
    self
      .payment
      .lock()
      .unwrap()
      .clone()
      .ok_or_else(|| AppError::GatewayRejected(format!("unknown payment {}", payment_id)))
  }
}
