//! Request extractors.

use crate::errors::AppError;
use crate::models::User;
use crate::services::auth;
use crate::state::AppState;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

pub const AUTH_COOKIE: &str = "auth_token";

/// The single authentication strategy: a bearer token in the Authorization
/// header, or the `auth_token` cookie the login endpoints set for browser
/// clients. Either resolves through the token table to a full `User`, or the
/// request fails with a typed 401.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user: User,
  /// Token the request authenticated with; logout revokes exactly this one.
  pub token: String,
}

fn token_from_request(req: &HttpRequest) -> Option<String> {
  if let Some(header) = req.headers().get("Authorization") {
    if let Ok(value) = header.to_str() {
      if let Some(token) = value.strip_prefix("Bearer ") {
        return Some(token.trim().to_string());
      }
    }
  }
  req.cookie(AUTH_COOKIE).map(|c| c.value().to_string())
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = token_from_request(req);

    Box::pin(async move {
      let state =
        state.ok_or_else(|| AppError::Internal("AppState missing from request context.".to_string()))?;
      let Some(token) = token else {
        warn!("Unauthenticated request: no bearer token or auth cookie.");
        return Err(AppError::Auth("Authentication required.".to_string()));
      };
      let user = auth::user_for_token(&state.db_pool, &token).await?;
      Ok(AuthenticatedUser { user, token })
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::test::TestRequest;

  #[test]
  fn bearer_header_wins_over_cookie() {
    let req = TestRequest::default()
      .insert_header(("Authorization", "Bearer abc123"))
      .cookie(actix_web::cookie::Cookie::new(AUTH_COOKIE, "cookie-token"))
      .to_http_request();
    assert_eq!(token_from_request(&req).as_deref(), Some("abc123"));
  }

  #[test]
  fn cookie_is_used_when_no_header_present() {
    let req = TestRequest::default()
      .cookie(actix_web::cookie::Cookie::new(AUTH_COOKIE, "cookie-token"))
      .to_http_request();
    assert_eq!(token_from_request(&req).as_deref(), Some("cookie-token"));
  }

  #[test]
  fn absent_credentials_yield_none() {
    let req = TestRequest::default().to_http_request();
    assert_eq!(token_from_request(&req), None);
  }

  #[test]
  fn malformed_authorization_header_is_ignored() {
    let req = TestRequest::default()
      .insert_header(("Authorization", "Token abc123"))
      .to_http_request();
    assert_eq!(token_from_request(&req), None);
  }
}
