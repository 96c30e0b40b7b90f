use actix_web::{web, HttpResponse};
use serde_json::Value as JsonValue;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::services::reconciliation::{self, WebhookQuery};
use crate::state::AppState;

/// Payment gateway push endpoint. Deliveries are at-least-once and unordered;
/// reconciliation absorbs every failure internally, so this handler always
/// acknowledges with 200 — an error status would only trigger a retry storm
/// that cannot fix anything.
#[instrument(name = "handler::payment_webhook", skip(app_state, body, query))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  body: web::Bytes,
  query: web::Query<WebhookQuery>,
) -> Result<HttpResponse, AppError> {
  info!("Received payment webhook. Payload size: {} bytes.", body.len());

  // Some deliveries carry everything in the query string with an empty body.
  let parsed_body: JsonValue = serde_json::from_slice(&body).unwrap_or_else(|e| {
    if !body.is_empty() {
      warn!(error = %e, "Webhook body is not valid JSON; relying on query parameters.");
    }
    JsonValue::Null
  });

  reconciliation::process_notification(app_state.get_ref(), parsed_body, query.into_inner()).await;

  Ok(HttpResponse::Ok().finish())
}
