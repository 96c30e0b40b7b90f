use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub category_id: Option<Uuid>,
  pub aroma: Option<String>,
  pub price: Decimal,
  pub sale_price: Option<Decimal>,
  pub on_sale: bool,
  pub stock: i32,
  pub description: String,
  pub image_url: Option<String>,
  pub featured: bool,
  pub created_at: DateTime<Utc>,
}

impl Product {
  /// Unit price a buyer pays right now: the promotional price while the
  /// product is flagged on sale, the base price otherwise.
  pub fn effective_price(&self) -> Decimal {
    if self.on_sale {
      self.sale_price.unwrap_or(self.price)
    } else {
      self.price
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  fn product(price: Decimal, sale_price: Option<Decimal>, on_sale: bool) -> Product {
    Product {
      id: Uuid::new_v4(),
      name: "Jabon Lavanda".to_string(),
      category_id: None,
      aroma: Some("Lavanda".to_string()),
      price,
      sale_price,
      on_sale,
      stock: 5,
      description: "Huele rico".to_string(),
      image_url: None,
      featured: false,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn effective_price_uses_base_price_when_not_on_sale() {
    let p = product(dec!(10.00), Some(dec!(7.00)), false);
    assert_eq!(p.effective_price(), dec!(10.00));
  }

  #[test]
  fn effective_price_uses_sale_price_when_on_sale() {
    let p = product(dec!(30.00), Some(dec!(20.00)), true);
    assert_eq!(p.effective_price(), dec!(20.00));
  }

  #[test]
  fn effective_price_falls_back_when_sale_price_missing() {
    // Flagged on sale but the promo price was never filled in.
    let p = product(dec!(30.00), None, true);
    assert_eq!(p.effective_price(), dec!(30.00));
  }
}
