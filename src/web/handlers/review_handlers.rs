use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::FromRow;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Review;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

pub const MAX_COMMENT_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CreateReviewPayload {
  #[serde(rename = "puntuacion")]
  pub rating: i32,
  #[serde(rename = "comentario", default)]
  pub comment: String,
}

#[derive(Debug, serde::Serialize, FromRow)]
pub struct TestimonialPayload {
  pub id: Uuid,
  #[serde(rename = "producto")]
  pub product_id: Uuid,
  #[serde(rename = "producto_nombre")]
  pub product_name: String,
  #[serde(rename = "usuario")]
  pub username: String,
  #[serde(rename = "puntuacion")]
  pub rating: i32,
  #[serde(rename = "comentario")]
  pub comment: String,
  #[serde(rename = "fecha")]
  pub created_at: DateTime<Utc>,
}

pub fn validate_review(rating: i32, comment: &str) -> Result<(), AppError> {
  if !(1..=5).contains(&rating) {
    return Err(AppError::Validation("Rating must be between 1 and 5".to_string()));
  }
  if comment.trim().is_empty() {
    return Err(AppError::Validation("Comment cannot be empty".to_string()));
  }
  if comment.chars().count() > MAX_COMMENT_LENGTH {
    return Err(AppError::Validation(format!(
      "Comment cannot exceed {} characters",
      MAX_COMMENT_LENGTH
    )));
  }
  Ok(())
}

/// Reviews are gated on a completed purchase: the user must have a paid order
/// containing the product. New reviews stay hidden until moderated.
#[instrument(
  name = "handler::create_review",
  skip(app_state, path, payload, auth_user),
  fields(user_id = %auth_user.user.id, product_id = %path.as_ref())
)]
pub async fn create_review_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  payload: web::Json<CreateReviewPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  validate_review(payload.rating, &payload.comment)?;

  let product_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
    .bind(product_id)
    .fetch_one(&app_state.db_pool)
    .await?;
  if !product_exists {
    return Err(AppError::NotFound(format!("Product {} not found", product_id)));
  }

  let has_purchased: bool = sqlx::query_scalar(
    "SELECT EXISTS(\
       SELECT 1 FROM order_lines l \
       JOIN orders o ON o.id = l.order_id \
       WHERE o.user_id = $1 AND l.product_id = $2 AND o.status IN ('paid', 'delivered'))",
  )
  .bind(auth_user.user.id)
  .bind(product_id)
  .fetch_one(&app_state.db_pool)
  .await?;
  if !has_purchased {
    return Err(AppError::Forbidden(
      "Only buyers of this product can review it".to_string(),
    ));
  }

  let review: Review = sqlx::query_as(
    "INSERT INTO reviews (id, product_id, user_id, rating, comment, moderated) VALUES ($1, $2, $3, $4, $5, false) \
     RETURNING id, product_id, user_id, rating, comment, moderated, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(product_id)
  .bind(auth_user.user.id)
  .bind(payload.rating)
  .bind(payload.comment.trim())
  .fetch_one(&app_state.db_pool)
  .await?;

  info!("Review {} created; pending moderation.", review.id);
  Ok(HttpResponse::Created().json(json!({
    "message": "Review submitted; it will appear once moderated.",
    "id": review.id,
  })))
}

/// Public landing-page feed: the six newest moderated reviews.
#[instrument(name = "handler::list_testimonials", skip(app_state))]
pub async fn list_testimonials_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let testimonials: Vec<TestimonialPayload> = sqlx::query_as(
    "SELECT r.id, r.product_id, p.name AS product_name, u.username, r.rating, r.comment, r.created_at \
     FROM reviews r \
     JOIN products p ON p.id = r.product_id \
     JOIN users u ON u.id = r.user_id \
     WHERE r.moderated ORDER BY r.created_at DESC LIMIT 6",
  )
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(testimonials))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ratings_outside_one_to_five_are_rejected() {
    assert!(validate_review(0, "nice").is_err());
    assert!(validate_review(6, "nice").is_err());
    assert!(validate_review(1, "nice").is_ok());
    assert!(validate_review(5, "nice").is_ok());
  }

  #[test]
  fn blank_comment_is_rejected() {
    assert!(validate_review(4, "   ").is_err());
  }

  #[test]
  fn overlong_comment_is_rejected() {
    let comment = "a".repeat(MAX_COMMENT_LENGTH + 1);
    assert!(validate_review(4, &comment).is_err());
    let comment = "a".repeat(MAX_COMMENT_LENGTH);
    assert!(validate_review(4, &comment).is_ok());
  }
}
