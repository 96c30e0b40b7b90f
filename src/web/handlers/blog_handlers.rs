use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, serde::Serialize, FromRow)]
pub struct PostPayload {
  pub id: Uuid,
  #[serde(rename = "titulo")]
  pub title: String,
  pub slug: String,
  #[serde(rename = "contenido")]
  pub content: String,
  #[serde(rename = "imagen")]
  pub image_url: Option<String>,
  #[serde(rename = "autor")]
  pub author_name: String,
  #[serde(rename = "fecha_publicacion")]
  pub published_at: DateTime<Utc>,
}

const POST_PAYLOAD_SELECT: &str =
  "SELECT p.id, p.title, p.slug, p.content, p.image_url, u.username AS author_name, p.published_at \
   FROM posts p JOIN users u ON u.id = p.author_id";

#[instrument(name = "handler::list_posts", skip(app_state))]
pub async fn list_posts_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let posts: Vec<PostPayload> = sqlx::query_as(&format!("{} ORDER BY p.published_at DESC", POST_PAYLOAD_SELECT))
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(posts))
}

#[instrument(name = "handler::get_post", skip(app_state, path), fields(slug = %path.as_ref()))]
pub async fn get_post_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let slug = path.into_inner();
  let post: Option<PostPayload> = sqlx::query_as(&format!("{} WHERE p.slug = $1", POST_PAYLOAD_SELECT))
    .bind(&slug)
    .fetch_optional(&app_state.db_pool)
    .await?;
  match post {
    Some(post) => Ok(HttpResponse::Ok().json(post)),
    None => Err(AppError::NotFound("Post not found".to_string())),
  }
}
