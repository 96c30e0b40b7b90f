use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Inquiry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct InquiryPayload {
  #[serde(rename = "nombre", default)]
  pub name: String,
  #[serde(default)]
  pub email: String,
  #[serde(rename = "asunto", default)]
  pub subject: String,
  #[serde(rename = "mensaje", default)]
  pub message: String,
}

fn validate_inquiry(payload: &InquiryPayload) -> Result<(), AppError> {
  if payload.name.trim().is_empty() || payload.subject.trim().is_empty() || payload.message.trim().is_empty() {
    return Err(AppError::Validation("Name, subject and message are required".to_string()));
  }
  // Enough validation for a contact form; real address checks happen when we reply.
  if !payload.email.contains('@') {
    return Err(AppError::Validation("A valid email is required".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::submit_inquiry", skip(app_state, payload))]
pub async fn submit_inquiry_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<InquiryPayload>,
) -> Result<HttpResponse, AppError> {
  validate_inquiry(&payload)?;

  let inquiry: Inquiry = sqlx::query_as(
    "INSERT INTO inquiries (id, name, email, subject, message) VALUES ($1, $2, $3, $4, $5) \
     RETURNING id, name, email, subject, message, read, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(payload.name.trim())
  .bind(payload.email.trim().to_lowercase())
  .bind(payload.subject.trim())
  .bind(payload.message.trim())
  .fetch_one(&app_state.db_pool)
  .await?;

  info!("Inquiry {} stored from '{}'.", inquiry.id, inquiry.name);
  Ok(HttpResponse::Created().json(json!({"message": "Inquiry received", "id": inquiry.id})))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn payload(name: &str, email: &str, subject: &str, message: &str) -> InquiryPayload {
    InquiryPayload {
      name: name.to_string(),
      email: email.to_string(),
      subject: subject.to_string(),
      message: message.to_string(),
    }
  }

  #[test]
  fn complete_inquiry_passes_validation() {
    assert!(validate_inquiry(&payload("Ana", "ana@example.com", "Hola", "Consulta")).is_ok());
  }

  #[test]
  fn missing_fields_are_rejected() {
    assert!(validate_inquiry(&payload("", "ana@example.com", "Hola", "Consulta")).is_err());
    assert!(validate_inquiry(&payload("Ana", "ana@example.com", " ", "Consulta")).is_err());
    assert!(validate_inquiry(&payload("Ana", "ana@example.com", "Hola", "")).is_err());
  }

  #[test]
  fn email_without_at_sign_is_rejected() {
    assert!(validate_inquiry(&payload("Ana", "not-an-email", "Hola", "Consulta")).is_err());
  }
}
