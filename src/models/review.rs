use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Reviews are held back until a moderator flips `moderated`; only moderated
/// ones surface through the public testimonials listing.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
  pub id: Uuid,
  pub product_id: Uuid,
  pub user_id: Uuid,
  pub rating: i32,
  pub comment: String,
  pub moderated: bool,
  pub created_at: DateTime<Utc>,
}
