//! Read-only projection of a user's purchases, newest first, with nested
//! lines and a human-readable status label. Field names match what the
//! storefront already consumes.

use crate::errors::Result;
use crate::models::{Order, OrderStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
pub struct HistoryLine {
  pub id: Uuid,
  #[serde(skip)]
  pub order_id: Uuid,
  #[serde(rename = "producto")]
  pub product_id: Uuid,
  #[serde(rename = "producto_nombre")]
  pub product_name: String,
  #[serde(rename = "cantidad")]
  pub quantity: i32,
  #[serde(rename = "precio_unitario")]
  pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct HistoryEntry {
  pub id: Uuid,
  #[serde(rename = "fecha_venta")]
  pub created_at: DateTime<Utc>,
  #[serde(rename = "total_pagado")]
  pub total_amount: Decimal,
  #[serde(rename = "estado")]
  pub status: OrderStatus,
  #[serde(rename = "estado_texto")]
  pub status_label: &'static str,
  pub items: Vec<HistoryLine>,
}

#[instrument(name = "history::purchase_history", skip(pool))]
pub async fn purchase_history(pool: &PgPool, user_id: Uuid) -> Result<Vec<HistoryEntry>> {
  let orders: Vec<Order> = sqlx::query_as(
    "SELECT id, user_id, status, total_amount, created_at FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  if orders.is_empty() {
    return Ok(Vec::new());
  }

  let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
  let lines: Vec<HistoryLine> = sqlx::query_as(
    "SELECT l.id, l.order_id, l.product_id, p.name AS product_name, l.quantity, l.unit_price \
     FROM order_lines l JOIN products p ON p.id = l.product_id \
     WHERE l.order_id = ANY($1)",
  )
  .bind(&order_ids)
  .fetch_all(pool)
  .await?;

  let mut lines_by_order: HashMap<Uuid, Vec<HistoryLine>> = HashMap::new();
  for line in lines {
    lines_by_order.entry(line.order_id).or_default().push(line);
  }

  Ok(
    orders
      .into_iter()
      .map(|order| HistoryEntry {
        id: order.id,
        created_at: order.created_at,
        total_amount: order.total_amount,
        status: order.status,
        status_label: order.status.label(),
        items: lines_by_order.remove(&order.id).unwrap_or_default(),
      })
      .collect(),
  )
}
