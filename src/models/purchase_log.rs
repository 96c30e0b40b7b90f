use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only audit record of checkout and payment-confirmation events.
/// Rows are never deleted; `detail` grows as the workflow progresses and
/// `payment_reference` starts as the order id and is later replaced by the
/// gateway's real payment id.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseLog {
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_id: Option<Uuid>,
  pub payment_reference: Option<String>,
  pub detail: String,
  pub amount: Decimal,
  pub created_at: DateTime<Utc>,
}
