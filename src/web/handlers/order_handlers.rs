use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::models::PurchaseLog;
use crate::services::history;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::purchase_history", skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn purchase_history_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let entries = history::purchase_history(&app_state.db_pool, auth_user.user.id).await?;
  Ok(HttpResponse::Ok().json(entries))
}

/// Raw audit trail for support staff; regular accounts get a 403.
#[instrument(name = "handler::list_purchase_logs", skip(app_state, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn list_purchase_logs_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  if !auth_user.user.is_staff {
    return Err(AppError::Forbidden("Staff access required".to_string()));
  }
  let logs: Vec<PurchaseLog> = sqlx::query_as(
    "SELECT id, user_id, order_id, payment_reference, detail, amount, created_at \
     FROM purchase_logs ORDER BY created_at DESC LIMIT 200",
  )
  .fetch_all(&app_state.db_pool)
  .await?;
  Ok(HttpResponse::Ok().json(logs))
}
