use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  InProgress,
  Paid,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// Human-readable label shown in purchase history.
  pub fn label(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "Pending",
      OrderStatus::InProgress => "In progress",
      OrderStatus::Paid => "Paid - Preparing shipment",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
    }
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub status: OrderStatus,
  pub total_amount: Decimal,
  pub created_at: DateTime<Utc>,
}

/// One product + quantity + price captured at sale time. The snapshot price is
/// immutable and independent of later product price changes.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderLine {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub unit_price: Decimal,
}

impl OrderLine {
  pub fn subtotal(&self) -> Decimal {
    self.unit_price * Decimal::from(self.quantity)
  }
}
