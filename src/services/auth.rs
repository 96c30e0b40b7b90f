//! Password hashing and the persistent-token session store.

use crate::errors::{AppError, Result};
use crate::models::User;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Hashes a plain-text password using Argon2.
#[instrument(name = "auth::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  let argon2_hasher = Argon2::default();

  match argon2_hasher.hash_password(password.as_bytes(), &salt) {
    Ok(password_hash) => Ok(password_hash.to_string()),
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing failed: {}", argon_err)))
    }
  }
}

/// Verifies a plain-text password against a stored Argon2 hash.
#[instrument(name = "auth::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool> {
  if provided_password.is_empty() {
    return Err(AppError::Auth("Password cannot be empty.".to_string()));
  }

  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: passwords do not match.");
      Ok(false)
    }
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 verification error.");
      Err(AppError::Internal(format!(
        "Password verification failed: {}",
        other_argon_err
      )))
    }
  }
}

/// Mints an opaque session token for the user and persists it.
#[instrument(name = "auth::issue_token", skip(pool))]
pub async fn issue_token(pool: &PgPool, user_id: Uuid) -> Result<String> {
  let token = new_token();
  sqlx::query("INSERT INTO auth_tokens (token, user_id) VALUES ($1, $2)")
    .bind(&token)
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(token)
}

/// Removes a session token; missing tokens are a no-op.
#[instrument(name = "auth::revoke_token", skip_all)]
pub async fn revoke_token(pool: &PgPool, token: &str) -> Result<()> {
  sqlx::query("DELETE FROM auth_tokens WHERE token = $1")
    .bind(token)
    .execute(pool)
    .await?;
  Ok(())
}

/// Resolves a token to its user, or a typed unauthenticated error.
pub async fn user_for_token(pool: &PgPool, token: &str) -> Result<User> {
  let user: Option<User> = sqlx::query_as(
    "SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name, u.is_staff, u.created_at \
     FROM users u JOIN auth_tokens t ON t.user_id = u.id WHERE t.token = $1",
  )
  .bind(token)
  .fetch_optional(pool)
  .await?;
  user.ok_or_else(|| AppError::Auth("Invalid or expired session token.".to_string()))
}

fn new_token() -> String {
  // Two v4 UUIDs worth of randomness, hex-compacted.
  format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}
