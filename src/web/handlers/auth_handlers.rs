use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::User;
use crate::services::auth;
use crate::state::AppState;
use crate::web::extractors::{AuthenticatedUser, AUTH_COOKIE};

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
  #[serde(default)]
  pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
  /// Email or username; the storefront sends whichever the user typed.
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileUpdatePayload {
  pub username: Option<String>,
  pub email: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub password: Option<String>,
}

fn session_cookie(token: &str) -> Cookie<'static> {
  Cookie::build(AUTH_COOKIE, token.to_string())
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish()
}

fn expired_session_cookie() -> Cookie<'static> {
  Cookie::build(AUTH_COOKIE, "")
    .path("/")
    .http_only(true)
    .max_age(CookieDuration::ZERO)
    .finish()
}

fn user_summary(user: &User) -> serde_json::Value {
  json!({
    "username": user.username,
    "email": user.email,
    "is_staff": user.is_staff,
  })
}

#[instrument(name = "handler::register", skip(app_state, payload))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> Result<HttpResponse, AppError> {
  let username = payload.username.trim().to_string();
  let password = payload.password.trim().to_string();
  let email = payload.email.trim().to_lowercase();

  if username.is_empty() || password.is_empty() || email.is_empty() {
    return Err(AppError::Validation("Username, password and email are required".to_string()));
  }

  let username_taken: bool =
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE lower(username) = lower($1))")
      .bind(&username)
      .fetch_one(&app_state.db_pool)
      .await?;
  if username_taken {
    return Err(AppError::Validation("Username is already in use".to_string()));
  }

  let email_taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
    .bind(&email)
    .fetch_one(&app_state.db_pool)
    .await?;
  if email_taken {
    return Err(AppError::Validation("This email is already registered".to_string()));
  }

  let password_hash = auth::hash_password(&password)?;
  let user: User = sqlx::query_as(
    "INSERT INTO users (id, username, email, password_hash) VALUES ($1, $2, $3, $4) \
     RETURNING id, username, email, password_hash, first_name, last_name, is_staff, created_at",
  )
  .bind(Uuid::new_v4())
  .bind(&username)
  .bind(&email)
  .bind(&password_hash)
  .fetch_one(&app_state.db_pool)
  .await?;

  let token = auth::issue_token(&app_state.db_pool, user.id).await?;
  info!("User '{}' registered.", user.username);

  let mut body = user_summary(&user);
  body["message"] = json!("User created and logged in");
  body["token"] = json!(token);
  Ok(HttpResponse::Created().cookie(session_cookie(&token)).json(body))
}

#[instrument(name = "handler::login", skip(app_state, payload))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  if payload.email.is_empty() || payload.password.is_empty() {
    return Err(AppError::Validation("Email/username and password are required".to_string()));
  }

  let user: Option<User> = sqlx::query_as(
    "SELECT id, username, email, password_hash, first_name, last_name, is_staff, created_at \
     FROM users WHERE lower(email) = lower($1) OR lower(username) = lower($1)",
  )
  .bind(payload.email.trim())
  .fetch_optional(&app_state.db_pool)
  .await?;
  let Some(user) = user else {
    warn!("Login attempt for unknown account.");
    return Err(AppError::Validation("User not found".to_string()));
  };

  if !auth::verify_password(&user.password_hash, &payload.password)? {
    return Err(AppError::Validation("Incorrect password".to_string()));
  }

  let token = auth::issue_token(&app_state.db_pool, user.id).await?;
  info!("User '{}' logged in.", user.username);

  let mut body = user_summary(&user);
  body["message"] = json!("Login successful");
  body["token"] = json!(token);
  Ok(HttpResponse::Ok().cookie(session_cookie(&token)).json(body))
}

/// Logout never fails: if the request carried no (or an invalid) token there
/// is nothing to revoke, but the cookie is cleared regardless.
#[instrument(name = "handler::logout", skip(app_state, auth_user))]
pub async fn logout_handler(
  app_state: web::Data<AppState>,
  auth_user: Option<AuthenticatedUser>,
) -> Result<HttpResponse, AppError> {
  if let Some(auth_user) = auth_user {
    auth::revoke_token(&app_state.db_pool, &auth_user.token).await?;
    info!("User '{}' logged out.", auth_user.user.username);
  }
  Ok(
    HttpResponse::Ok()
      .cookie(expired_session_cookie())
      .json(json!({"status": "success", "message": "Session closed"})),
  )
}

#[instrument(name = "handler::me", skip(auth_user), fields(user_id = %auth_user.user.id))]
pub async fn me_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  let user = &auth_user.user;
  Ok(HttpResponse::Ok().json(json!({
    "username": user.username,
    "email": user.email,
    "first_name": user.first_name,
    "last_name": user.last_name,
    "is_staff": user.is_staff,
    "authenticated": true,
  })))
}

#[instrument(name = "handler::update_profile", skip(app_state, payload, auth_user), fields(user_id = %auth_user.user.id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ProfileUpdatePayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let current = &auth_user.user;
  let username = payload
    .username
    .as_deref()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .unwrap_or(&current.username)
    .to_string();
  let email = payload
    .email
    .as_deref()
    .map(|s| s.trim().to_lowercase())
    .filter(|s| !s.is_empty())
    .unwrap_or_else(|| current.email.clone());
  let first_name = payload
    .first_name
    .as_deref()
    .map(str::trim)
    .map(String::from)
    .or_else(|| current.first_name.clone());
  let last_name = payload
    .last_name
    .as_deref()
    .map(str::trim)
    .map(String::from)
    .or_else(|| current.last_name.clone());

  let password_hash = match payload.password.as_deref().filter(|p| !p.is_empty()) {
    Some(new_password) => auth::hash_password(new_password)?,
    None => current.password_hash.clone(),
  };

  let updated: User = sqlx::query_as(
    "UPDATE users SET username = $1, email = $2, first_name = $3, last_name = $4, password_hash = $5 \
     WHERE id = $6 \
     RETURNING id, username, email, password_hash, first_name, last_name, is_staff, created_at",
  )
  .bind(&username)
  .bind(&email)
  .bind(&first_name)
  .bind(&last_name)
  .bind(&password_hash)
  .bind(current.id)
  .fetch_one(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({
    "message": "Profile updated",
    "username": updated.username,
    "email": updated.email,
    "first_name": updated.first_name,
    "last_name": updated.last_name,
    "is_staff": updated.is_staff,
  })))
}
