use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::checkout::{self, CartLine};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequestPayload {
  #[serde(default)]
  pub items: Vec<CartLine>,
}

#[instrument(
  name = "handler::checkout",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.user.id, lines = payload.items.len())
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  info!("Checkout initiation attempt by user {}.", auth_user.user.username);
  let confirmation = checkout::begin_checkout(app_state.get_ref(), &auth_user.user, &payload.items).await?;
  Ok(HttpResponse::Created().json(confirmation))
}
