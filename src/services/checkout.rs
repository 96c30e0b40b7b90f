//! Checkout initiator: cart validation, stock reservation, order creation and
//! payment-preference request, all inside one transaction.
//!
//! Stock is decremented here, at checkout time, while every referenced product
//! row is held under `FOR UPDATE`; the webhook later only flips the order to
//! paid. If the gateway rejects the preference request the transaction is
//! dropped unconditionally, so no order, no lines and no stock reservation
//! survive a failed preference creation.

use crate::errors::{AppError, Result};
use crate::models::{OrderLine, Product, User};
use crate::services::gateway::{BackUrls, PreferenceItem, PreferenceRequest};
use crate::state::AppState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

/// One cart entry as sent by the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
  #[serde(rename = "producto_id")]
  pub product_id: Uuid,
  #[serde(rename = "cantidad")]
  pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CheckoutConfirmation {
  #[serde(rename = "pedido_id")]
  pub order_id: Uuid,
  pub preference_id: String,
  #[serde(rename = "url_pago")]
  pub redirect_url: String,
  pub total: Decimal,
}

/// Rejects carts that cannot possibly be charged before touching the database.
fn validate_cart(items: &[CartLine]) -> Result<()> {
  if items.is_empty() {
    return Err(AppError::Validation("Cart is empty".to_string()));
  }
  for line in items {
    if line.quantity <= 0 {
      return Err(AppError::Validation(format!(
        "Quantity for product {} must be positive",
        line.product_id
      )));
    }
  }
  Ok(())
}

#[instrument(name = "checkout::begin", skip(state, user, items), fields(user_id = %user.id, lines = items.len()))]
pub async fn begin_checkout(state: &AppState, user: &User, items: &[CartLine]) -> Result<CheckoutConfirmation> {
  validate_cart(items)?;

  let mut tx = state.db_pool.begin().await?;

  let order_id = Uuid::new_v4();
  sqlx::query("INSERT INTO orders (id, user_id, status, total_amount) VALUES ($1, $2, 'pending', 0)")
    .bind(order_id)
    .bind(user.id)
    .execute(&mut *tx)
    .await?;

  let mut total = Decimal::ZERO;
  let mut preference_items = Vec::with_capacity(items.len());

  for line in items {
    // Exclusive row lock: concurrent buyers of the same product serialize
    // here, which is what keeps stock from going negative.
    let product: Option<Product> = sqlx::query_as(
      "SELECT id, name, category_id, aroma, price, sale_price, on_sale, stock, description, image_url, featured, created_at \
       FROM products WHERE id = $1 FOR UPDATE",
    )
    .bind(line.product_id)
    .fetch_optional(&mut *tx)
    .await?;
    let product = product.ok_or(AppError::ProductNotFound(line.product_id))?;

    if product.stock < line.quantity {
      return Err(AppError::InsufficientStock {
        product: product.name,
        available: product.stock,
      });
    }

    let order_line = OrderLine {
      id: Uuid::new_v4(),
      order_id,
      product_id: product.id,
      quantity: line.quantity,
      unit_price: product.effective_price(),
    };
    total += order_line.subtotal();

    sqlx::query("INSERT INTO order_lines (id, order_id, product_id, quantity, unit_price) VALUES ($1, $2, $3, $4, $5)")
      .bind(order_line.id)
      .bind(order_line.order_id)
      .bind(order_line.product_id)
      .bind(order_line.quantity)
      .bind(order_line.unit_price)
      .execute(&mut *tx)
      .await?;

    // Reserve stock now; still under the row lock taken above.
    sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2")
      .bind(line.quantity)
      .bind(product.id)
      .execute(&mut *tx)
      .await?;

    preference_items.push(PreferenceItem {
      title: product.name.clone(),
      quantity: line.quantity,
      unit_price: order_line.unit_price,
      currency_id: state.config.currency_code.clone(),
    });
  }

  sqlx::query("UPDATE orders SET total_amount = $1 WHERE id = $2")
    .bind(total)
    .bind(order_id)
    .execute(&mut *tx)
    .await?;

  // Audit trail. The payment reference starts out as the order id; the
  // webhook swaps in the gateway's real payment id once the payment clears.
  sqlx::query(
    "INSERT INTO purchase_logs (id, user_id, order_id, payment_reference, detail, amount) \
     VALUES ($1, $2, $3, $4, $5, $6)",
  )
  .bind(Uuid::new_v4())
  .bind(user.id)
  .bind(order_id)
  .bind(order_id.to_string())
  .bind(format!(
    "Started payment for order #{} via gateway. {} line(s).",
    order_id,
    items.len()
  ))
  .bind(total)
  .execute(&mut *tx)
  .await?;

  // Gateway call happens before commit on purpose: if preference creation
  // fails, dropping `tx` rolls back the whole reservation.
  let preference_request = PreferenceRequest {
    items: preference_items,
    external_reference: order_id.to_string(),
    back_urls: BackUrls {
      success: state.config.checkout_success_url.clone(),
      failure: state.config.checkout_failure_url.clone(),
      pending: state.config.checkout_pending_url.clone(),
    },
    auto_return: "approved".to_string(),
    notification_url: state.config.notification_url(),
  };
  let preference = state.gateway.create_preference(&preference_request).await?;

  tx.commit().await?;

  info!(
    order_id = %order_id,
    preference_id = %preference.id,
    %total,
    "Checkout completed; awaiting payment confirmation."
  );

  Ok(CheckoutConfirmation {
    order_id,
    preference_id: preference.id,
    redirect_url: preference.init_point,
    total,
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(quantity: i32) -> CartLine {
    CartLine {
      product_id: Uuid::new_v4(),
      quantity,
    }
  }

  #[test]
  fn empty_cart_is_rejected() {
    let err = validate_cart(&[]).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
  }

  #[test]
  fn non_positive_quantities_are_rejected() {
    assert!(validate_cart(&[line(0)]).is_err());
    assert!(validate_cart(&[line(-3)]).is_err());
    assert!(validate_cart(&[line(1), line(0)]).is_err());
  }

  #[test]
  fn well_formed_cart_passes_validation() {
    assert!(validate_cart(&[line(1), line(5)]).is_ok());
  }

  #[test]
  fn cart_line_deserializes_storefront_field_names() {
    let parsed: CartLine = serde_json::from_str(
      r#"{"producto_id": "7f8a1c8e-54d1-4f4a-9a25-8c1f2d3e4b5a", "cantidad": 2}"#,
    )
    .unwrap();
    assert_eq!(parsed.quantity, 2);
  }
}
