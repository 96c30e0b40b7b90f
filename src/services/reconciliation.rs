//! Webhook reconciliation: turn the gateway's asynchronous, at-least-once
//! payment notifications into exactly-once order confirmation.
//!
//! The PAID transition is guarded by a conditional UPDATE that only touches
//! orders still in `pending`/`in_progress`, so replayed notifications are
//! no-ops. Every failure in here is absorbed and logged: the webhook endpoint
//! always acknowledges with 200, because having the gateway retry does not
//! change the circumstances that made the first delivery fail.

use crate::errors::{AppError, Result};
use crate::models::{OrderStatus, User};
use crate::services::notifier::Notification;
use crate::state::AppState;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Query-string fallback some gateway deliveries use instead of a JSON body.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
  #[serde(rename = "data.id")]
  pub data_id: Option<String>,
  #[serde(rename = "type")]
  pub kind: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
  /// Not a payment notification, or no payment id anywhere.
  Ignored,
  /// The payment exists but is not approved; nothing mutated.
  NotApproved,
  /// The referenced order was already paid (duplicate delivery).
  AlreadyProcessed,
  /// First approval for this order: stock stays as reserved at checkout,
  /// status flipped to paid, log updated, buyer notified.
  Confirmed { order_id: Uuid },
}

/// Pulls the payment id out of a notification, body first, query second.
/// Only `type == "payment"` events carry one.
fn extract_payment_id(body: &JsonValue, query: &WebhookQuery) -> Option<String> {
  let kind = body
    .get("type")
    .and_then(JsonValue::as_str)
    .map(String::from)
    .or_else(|| query.kind.clone());
  if kind.as_deref() != Some("payment") {
    return None;
  }
  let body_id = match body.get("data").and_then(|d| d.get("id")) {
    Some(JsonValue::String(s)) => Some(s.clone()),
    Some(JsonValue::Number(n)) => Some(n.to_string()),
    _ => None,
  };
  body_id.or_else(|| query.data_id.clone())
}

/// Entry point used by the webhook handler. Absorb-and-log: the caller never
/// sees an error, so the gateway is never told to retry.
pub async fn process_notification(state: &AppState, body: JsonValue, query: WebhookQuery) {
  match reconcile(state, &body, &query).await {
    Ok(outcome) => info!(?outcome, "Payment notification processed."),
    Err(err) => warn!(error = %err, "Payment notification absorbed after failure."),
  }
}

#[derive(Debug, FromRow)]
struct ConfirmedOrderRow {
  user_id: Uuid,
  total_amount: Decimal,
}

#[instrument(name = "reconciliation::reconcile", skip(state, body, query))]
async fn reconcile(state: &AppState, body: &JsonValue, query: &WebhookQuery) -> Result<ReconcileOutcome> {
  let Some(payment_id) = extract_payment_id(body, query) else {
    return Ok(ReconcileOutcome::Ignored);
  };

  let payment = state.gateway.get_payment(&payment_id).await?;
  if !payment.is_approved() {
    info!(payment_id = %payment.id, status = %payment.status, "Payment not approved; leaving order untouched.");
    return Ok(ReconcileOutcome::NotApproved);
  }

  let order_id = payment
    .external_reference
    .as_deref()
    .and_then(|r| Uuid::parse_str(r).ok())
    .ok_or_else(|| {
      AppError::Validation(format!(
        "Approved payment {} carries no usable external reference",
        payment.id
      ))
    })?;

  let mut tx = state.db_pool.begin().await?;

  // Idempotency guard: only one delivery can win this UPDATE; later replays
  // match zero rows and fall through to AlreadyProcessed.
  let confirmed: Option<ConfirmedOrderRow> = sqlx::query_as(
    "UPDATE orders SET status = 'paid' \
     WHERE id = $1 AND status IN ('pending', 'in_progress') \
     RETURNING user_id, total_amount",
  )
  .bind(order_id)
  .fetch_optional(&mut *tx)
  .await?;

  let Some(confirmed) = confirmed else {
    let status: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
      .bind(order_id)
      .fetch_optional(&mut *tx)
      .await?;
    return match status {
      Some(_) => Ok(ReconcileOutcome::AlreadyProcessed),
      None => Err(AppError::NotFound(format!("Order {} not found for approved payment", order_id))),
    };
  };

  // Swap the temporary reference (order id) for the gateway's payment id and
  // extend the audit trail. The detail column is append-only.
  sqlx::query(
    "UPDATE purchase_logs \
     SET payment_reference = $1, detail = detail || $2 \
     WHERE payment_reference = $3",
  )
  .bind(&payment.id)
  .bind(" [PAYMENT CONFIRMED]")
  .bind(order_id.to_string())
  .execute(&mut *tx)
  .await?;

  tx.commit().await?;

  // Best-effort confirmation email, off the critical path.
  match sqlx::query_as::<_, User>(
    "SELECT id, username, email, password_hash, first_name, last_name, is_staff, created_at \
     FROM users WHERE id = $1",
  )
  .bind(confirmed.user_id)
  .fetch_optional(&state.db_pool)
  .await
  {
    Ok(Some(buyer)) => {
      state.notifier.enqueue(Notification::PurchaseConfirmed {
        recipient_name: buyer.display_name().to_string(),
        recipient_email: buyer.email,
        order_id,
        total: confirmed.total_amount,
      });
    }
    Ok(None) => warn!(user_id = %confirmed.user_id, "Buyer row missing; skipping confirmation email."),
    Err(e) => warn!(error = %e, "Could not load buyer for confirmation email."),
  }

  info!(order_id = %order_id, payment_id = %payment.id, "Order confirmed as paid.");
  Ok(ReconcileOutcome::Confirmed { order_id })
}


#[cfg(test)]
mod transactional_tests {
  use super::*;
  use crate::services::checkout::{begin_checkout, CartLine};
  use crate::services::gateway::PaymentInfo;
  use crate::services::test_support::{
    apply_schema, product_stock, seed_product, seed_user, state_with_gateway, StubGateway,
  };
  use crate::state::AppState;
  use rust_decimal_macros::dec;
  use serde_json::json;
  use sqlx::PgPool;
  use std::sync::Arc;

  /// Seeds a buyer with one pending order (quantity 1, stock 3 → 2) and
  /// returns the state, the scriptable gateway and the order id.
  async fn pending_order(pool: &PgPool) -> (AppState, Arc<StubGateway>, Uuid) {
    apply_schema(pool).await;
    let buyer = seed_user(pool, "ana", false).await;
    let product_id = seed_product(pool, "Jabon Lavanda", 3, dec!(10.00)).await;
    let gateway = Arc::new(StubGateway::default());
    let state = state_with_gateway(pool.clone(), gateway.clone());
    let confirmation = begin_checkout(&state, &buyer, &[CartLine { product_id, quantity: 1 }])
      .await
      .unwrap();
    (state, gateway, confirmation.order_id)
  }

  async fn order_status(pool: &PgPool, order_id: Uuid) -> OrderStatus {
    sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
      .bind(order_id)
      .fetch_one(pool)
      .await
      .unwrap()
  }

  #[sqlx::test(migrations = false)]
  async fn duplicate_approved_notification_confirms_only_once(pool: PgPool) {
    let (state, gateway, order_id) = pending_order(&pool).await;
    gateway.set_payment(PaymentInfo {
      id: "777".to_string(),
      status: "approved".to_string(),
      external_reference: Some(order_id.to_string()),
    });
    let body = json!({"type": "payment", "data": {"id": "777"}});

    let first = reconcile(&state, &body, &WebhookQuery::default()).await.unwrap();
    assert_eq!(first, ReconcileOutcome::Confirmed { order_id });
    let second = reconcile(&state, &body, &WebhookQuery::default()).await.unwrap();
    assert_eq!(second, ReconcileOutcome::AlreadyProcessed);

    assert_eq!(order_status(&pool, order_id).await, OrderStatus::Paid);

    // Stock was taken at checkout and exactly once: 3 - 1, untouched by either
    // delivery.
    let product_id: Uuid = sqlx::query_scalar("SELECT product_id FROM order_lines WHERE order_id = $1")
      .bind(order_id)
      .fetch_one(&pool)
      .await
      .unwrap();
    assert_eq!(product_stock(&pool, product_id).await, 2);

    let (reference, detail): (Option<String>, String) =
      sqlx::query_as("SELECT payment_reference, detail FROM purchase_logs WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(reference.as_deref(), Some("777"));
    assert_eq!(detail.matches("[PAYMENT CONFIRMED]").count(), 1);
  }

  #[sqlx::test(migrations = false)]
  async fn unapproved_payment_leaves_order_pending(pool: PgPool) {
    let (state, gateway, order_id) = pending_order(&pool).await;
    gateway.set_payment(PaymentInfo {
      id: "778".to_string(),
      status: "in_process".to_string(),
      external_reference: Some(order_id.to_string()),
    });
    let body = json!({"type": "payment", "data": {"id": "778"}});

    let outcome = reconcile(&state, &body, &WebhookQuery::default()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::NotApproved);
    assert_eq!(order_status(&pool, order_id).await, OrderStatus::Pending);
  }

  #[sqlx::test(migrations = false)]
  async fn approved_payment_for_unknown_order_is_absorbed(pool: PgPool) {
    let (state, gateway, _order_id) = pending_order(&pool).await;
    gateway.set_payment(PaymentInfo {
      id: "779".to_string(),
      status: "approved".to_string(),
      external_reference: Some(Uuid::new_v4().to_string()),
    });
    let body = json!({"type": "payment", "data": {"id": "779"}});

    let err = reconcile(&state, &body, &WebhookQuery::default()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // The public entry point swallows that error; the gateway only ever sees
    // a 200.
    process_notification(&state, body, WebhookQuery::default()).await;
  }
}
