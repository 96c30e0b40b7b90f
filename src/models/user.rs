use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub is_staff: bool,
  pub created_at: DateTime<Utc>,
}

impl User {
  /// Name used when addressing the user in notifications.
  pub fn display_name(&self) -> &str {
    match self.first_name.as_deref() {
      Some(first) if !first.is_empty() => first,
      _ => &self.username,
    }
  }
}
