use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Insufficient stock for '{product}'. Available: {available}")]
  InsufficientStock { product: String, available: i32 },

  #[error("Product {0} does not exist")]
  ProductNotFound(uuid::Uuid),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Payment gateway misconfigured: {0}")]
  GatewayConfig(String),

  #[error("Payment gateway rejected the request: {0}")]
  GatewayRejected(String),

  #[error("Payment gateway unreachable: {0}")]
  GatewayTransport(#[from] reqwest::Error),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Handlers occasionally bubble anyhow::Error out of helper code.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response.
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::InsufficientStock { product, available } => HttpResponse::BadRequest().json(json!({
        "error": format!("Insufficient stock for '{}'. Available: {}", product, available),
        "producto": product,
        "disponible": available,
      })),
      AppError::ProductNotFound(id) => {
        HttpResponse::BadRequest().json(json!({"error": format!("Product {} does not exist", id)}))
      }
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::Forbidden(m) => HttpResponse::Forbidden().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::GatewayConfig(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Payment configuration issue", "detail": m}))
      }
      AppError::GatewayRejected(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Payment provider error", "detail": m}))
      }
      AppError::GatewayTransport(e) => {
        HttpResponse::InternalServerError().json(json!({"error": "Payment provider unreachable", "detail": e.to_string()}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Result type alias for the application.
pub type Result<T, E = AppError> = std::result::Result<T, E>;

// actix's own extractor rejections (malformed JSON body, bad query string,
// unparsable path segment) default to plain-text responses. These handlers
// are wired into JsonConfig/QueryConfig/PathConfig so every user-visible 400
// carries the same `{"error": ...}` body as the rest of the API.

pub fn json_payload_error_handler(
  err: actix_web::error::JsonPayloadError,
  _req: &actix_web::HttpRequest,
) -> actix_web::Error {
  AppError::Validation(err.to_string()).into()
}

pub fn query_payload_error_handler(
  err: actix_web::error::QueryPayloadError,
  _req: &actix_web::HttpRequest,
) -> actix_web::Error {
  AppError::Validation(err.to_string()).into()
}

pub fn path_error_handler(err: actix_web::error::PathError, _req: &actix_web::HttpRequest) -> actix_web::Error {
  AppError::Validation(err.to_string()).into()
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;
  use actix_web::{test, web, App, HttpResponse};
  use serde::Deserialize;

  #[derive(Debug, Deserialize)]
  struct DummyPayload {
    #[allow(dead_code)]
    name: String,
  }

  async fn accept(_payload: web::Json<DummyPayload>) -> HttpResponse {
    HttpResponse::Ok().finish()
  }

  async fn accept_id(_id: web::Path<uuid::Uuid>) -> HttpResponse {
    HttpResponse::Ok().finish()
  }

  #[actix_web::test]
  async fn malformed_json_body_gets_structured_error_body() {
    let app = test::init_service(
      App::new()
        .app_data(web::JsonConfig::default().error_handler(json_payload_error_handler))
        .route("/consultas", web::post().to(accept)),
    )
    .await;

    let req = test::TestRequest::post()
      .uri("/consultas")
      .insert_header(("content-type", "application/json"))
      .set_payload("{not json")
      .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string(), "expected an error field, got {}", body);
  }

  #[actix_web::test]
  async fn unparsable_path_segment_gets_structured_error_body() {
    let app = test::init_service(
      App::new()
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .route("/productos/{id}", web::get().to(accept_id)),
    )
    .await;

    let req = test::TestRequest::get().uri("/productos/not-a-uuid").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
  }
}
