use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Contact-form submission.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Inquiry {
  pub id: Uuid,
  pub name: String,
  pub email: String,
  pub subject: String,
  pub message: String,
  pub read: bool,
  pub created_at: DateTime<Utc>,
}
