use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use sqlx::FromRow;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Category;
use crate::state::AppState;

/// Catalog payload with the field names the storefront consumes. `hay_stock`
/// tells the front whether to enable the buy button without promising an
/// exact count.
#[derive(Debug, serde::Serialize, FromRow)]
pub struct ProductPayload {
  pub id: Uuid,
  #[serde(rename = "nombre")]
  pub name: String,
  #[serde(rename = "categoria")]
  pub category_id: Option<Uuid>,
  #[serde(rename = "categoria_nombre")]
  pub category_name: Option<String>,
  pub aroma: Option<String>,
  #[serde(rename = "precio")]
  pub price: Decimal,
  #[serde(rename = "precio_oferta")]
  pub sale_price: Option<Decimal>,
  #[serde(rename = "en_oferta")]
  pub on_sale: bool,
  pub stock: i32,
  pub hay_stock: bool,
  #[serde(rename = "descripcion")]
  pub description: String,
  #[serde(rename = "imagen")]
  pub image_url: Option<String>,
}

const PRODUCT_PAYLOAD_SELECT: &str =
  "SELECT p.id, p.name, p.category_id, c.name AS category_name, p.aroma, p.price, p.sale_price, \
   p.on_sale, p.stock, p.stock > 0 AS hay_stock, p.description, p.image_url \
   FROM products p LEFT JOIN categories c ON c.id = p.category_id";

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products: Vec<ProductPayload> = sqlx::query_as(&format!("{} ORDER BY p.name ASC", PRODUCT_PAYLOAD_SELECT))
    .fetch_all(&app_state.db_pool)
    .await?;
  info!("Fetched {} products.", products.len());
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::list_sale_products", skip(app_state))]
pub async fn list_sale_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products: Vec<ProductPayload> =
    sqlx::query_as(&format!("{} WHERE p.on_sale ORDER BY p.name ASC", PRODUCT_PAYLOAD_SELECT))
      .fetch_all(&app_state.db_pool)
      .await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::list_featured_products", skip(app_state))]
pub async fn list_featured_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products: Vec<ProductPayload> =
    sqlx::query_as(&format!("{} WHERE p.featured ORDER BY p.created_at DESC", PRODUCT_PAYLOAD_SELECT))
      .fetch_all(&app_state.db_pool)
      .await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product: Option<ProductPayload> = sqlx::query_as(&format!("{} WHERE p.id = $1", PRODUCT_PAYLOAD_SELECT))
    .bind(product_id)
    .fetch_optional(&app_state.db_pool)
    .await?;

  match product {
    Some(product) => Ok(HttpResponse::Ok().json(product)),
    None => {
      warn!("Product {} not found.", product_id);
      Err(AppError::NotFound(format!("Product {} not found", product_id)))
    }
  }
}

#[instrument(name = "handler::list_categories", skip(app_state))]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories: Vec<Category> = sqlx::query_as("SELECT id, name, description FROM categories ORDER BY name ASC")
    .fetch_all(&app_state.db_pool)
    .await?;
  Ok(HttpResponse::Ok().json(categories))
}
