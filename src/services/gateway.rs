//! Thin translation layer to the external payment provider's REST API.
//!
//! The rest of the application only depends on the `PaymentGateway` trait:
//! build a preference (line items, callback URLs, notification URL) and look
//! a payment up by id. The MercadoPago-shaped HTTP implementation lives here
//! together with the response parsing, which is kept as plain functions so it
//! can be tested without a network.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, instrument};

#[derive(Debug, Clone, Serialize)]
pub struct PreferenceItem {
  pub title: String,
  pub quantity: i32,
  // The provider expects a JSON number here, not rust_decimal's default
  // string representation.
  #[serde(with = "rust_decimal::serde::float")]
  pub unit_price: Decimal,
  pub currency_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackUrls {
  pub success: String,
  pub failure: String,
  pub pending: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
  pub items: Vec<PreferenceItem>,
  /// Tag the preference with our order id so the webhook can find its way back.
  pub external_reference: String,
  pub back_urls: BackUrls,
  pub auto_return: String,
  pub notification_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preference {
  pub id: String,
  pub init_point: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInfo {
  pub id: String,
  pub status: String,
  pub external_reference: Option<String>,
}

impl PaymentInfo {
  pub fn is_approved(&self) -> bool {
    self.status == "approved"
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference>;
  async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo>;
}

/// HTTP client for the MercadoPago-style REST API.
pub struct MercadoPagoGateway {
  http: reqwest::Client,
  api_base_url: String,
  access_token: String,
}

impl MercadoPagoGateway {
  pub fn from_config(config: &AppConfig) -> Result<Self> {
    let access_token = config
      .mp_access_token
      .clone()
      .ok_or_else(|| AppError::GatewayConfig("MP_ACCESS_TOKEN is not set".to_string()))?;
    Ok(Self {
      http: reqwest::Client::new(),
      api_base_url: config.mp_api_base_url.trim_end_matches('/').to_string(),
      access_token,
    })
  }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
  #[instrument(name = "gateway::create_preference", skip(self, request), fields(external_reference = %request.external_reference))]
  async fn create_preference(&self, request: &PreferenceRequest) -> Result<Preference> {
    let url = format!("{}/checkout/preferences", self.api_base_url);
    let response = self
      .http
      .post(&url)
      .bearer_auth(&self.access_token)
      .json(request)
      .send()
      .await?;
    let body: JsonValue = response.json().await?;
    let preference = parse_preference_response(&body)?;
    info!(preference_id = %preference.id, "Payment preference created.");
    Ok(preference)
  }

  #[instrument(name = "gateway::get_payment", skip(self))]
  async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo> {
    let url = format!("{}/v1/payments/{}", self.api_base_url, payment_id);
    let response = self.http.get(&url).bearer_auth(&self.access_token).send().await?;
    let body: JsonValue = response.json().await?;
    parse_payment_response(&body)
  }
}

/// Stand-in used when no access token is configured: every operation fails
/// with `GatewayConfig` so catalog-only deployments still boot.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
  async fn create_preference(&self, _request: &PreferenceRequest) -> Result<Preference> {
    Err(AppError::GatewayConfig("MP_ACCESS_TOKEN is not set".to_string()))
  }

  async fn get_payment(&self, _payment_id: &str) -> Result<PaymentInfo> {
    Err(AppError::GatewayConfig("MP_ACCESS_TOKEN is not set".to_string()))
  }
}

/// A preference response without `id`/`init_point` means the provider
/// rejected the request (bad token, malformed items). The provider's own
/// message is propagated for operators.
fn parse_preference_response(body: &JsonValue) -> Result<Preference> {
  let id = body.get("id").and_then(JsonValue::as_str);
  let init_point = body.get("init_point").and_then(JsonValue::as_str);
  match (id, init_point) {
    (Some(id), Some(init_point)) => Ok(Preference {
      id: id.to_string(),
      init_point: init_point.to_string(),
    }),
    _ => {
      let provider_message = body
        .get("message")
        .and_then(JsonValue::as_str)
        .unwrap_or("unknown provider error");
      Err(AppError::GatewayRejected(provider_message.to_string()))
    }
  }
}

fn parse_payment_response(body: &JsonValue) -> Result<PaymentInfo> {
  // Payment ids arrive as JSON numbers from this provider.
  let id = match body.get("id") {
    Some(JsonValue::String(s)) => Some(s.clone()),
    Some(JsonValue::Number(n)) => Some(n.to_string()),
    _ => None,
  };
  let id = id.ok_or_else(|| {
    let provider_message = body
      .get("message")
      .and_then(JsonValue::as_str)
      .unwrap_or("payment lookup returned no id");
    AppError::GatewayRejected(provider_message.to_string())
  })?;
  let status = body
    .get("status")
    .and_then(JsonValue::as_str)
    .unwrap_or("unknown")
    .to_string();
  let external_reference = body
    .get("external_reference")
    .and_then(JsonValue::as_str)
    .map(String::from);
  Ok(PaymentInfo {
    id,
    status,
    external_reference,
  })
}
