// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{AppError, Result};

pub const PRICE_MIN_CENTS: i64 = 1;
pub const PRICE_MAX_CENTS: i64 = 100_000_000;
pub const AMOUNT_MAX: i32 = 1_000_000;
pub const DISCOUNT_MAX: i32 = 99;

/// Price after a percentage discount, rounded half up to the cent.
pub fn discount_price_cents(price_cents: i64, discount: i32) -> i64 {
  let discount = i64::from(discount.clamp(0, DISCOUNT_MAX));
  (price_cents * (100 - discount) + 50) / 100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub short_description: String,
  pub full_description: String,
  pub price_cents: i64,
  /// Units in stock, reserved ones included.
  pub amount: i32,
  /// Units held by carts and open orders.
  pub reserved: i32,
  pub discount: i32,
  pub brand_id: Uuid,
  pub category_id: Uuid,
  pub created_at: DateTime<Utc>,
}

impl Product {
  pub fn available(&self) -> i32 {
    self.amount - self.reserved
  }

  pub fn discount_price_cents(&self) -> i64 {
    discount_price_cents(self.price_cents, self.discount)
  }
}

/// Product as shown to clients, with derived figures.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
  pub id: Uuid,
  pub name: String,
  pub short_description: String,
  pub full_description: String,
  pub price_cents: i64,
  pub discount: i32,
  pub discount_price_cents: i64,
  pub available: i32,
  pub brand_id: Uuid,
  pub category_id: Uuid,
}

impl From<&Product> for ProductView {
  fn from(p: &Product) -> Self {
    Self {
      id: p.id,
      name: p.name.clone(),
      short_description: p.short_description.clone(),
      full_description: p.full_description.clone(),
      price_cents: p.price_cents,
      discount: p.discount,
      discount_price_cents: p.discount_price_cents(),
      available: p.available(),
      brand_id: p.brand_id,
      category_id: p.category_id,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
  pub brand_name: Option<String>,
  pub category_name: Option<String>,
}

/// Admin input for creating or replacing a product; labels go by name.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDraft {
  pub name: String,
  pub short_description: String,
  pub full_description: String,
  pub price_cents: i64,
  pub amount: i32,
  #[serde(default)]
  pub discount: i32,
  pub brand_name: String,
  pub category_name: String,
}

impl ProductDraft {
  pub fn validate(&self) -> Result<()> {
    check_len("name", &self.name, 2, 64)?;
    check_len("short_description", &self.short_description, 16, 256)?;
    check_len("full_description", &self.full_description, 64, 1028)?;
    if !(PRICE_MIN_CENTS..=PRICE_MAX_CENTS).contains(&self.price_cents) {
      return Err(AppError::Validation("Enter positive price".to_string()));
    }
    if !(0..=AMOUNT_MAX).contains(&self.amount) {
      return Err(AppError::Validation(format!("Amount must be between 0 and {}.", AMOUNT_MAX)));
    }
    if !(0..=DISCOUNT_MAX).contains(&self.discount) {
      return Err(AppError::Validation(format!("Discount must be between 0 and {}.", DISCOUNT_MAX)));
    }
    Ok(())
  }
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
  let len = value.trim().chars().count();
  if len < min || len > max {
    return Err(AppError::Validation(format!(
      "Field '{}' must be between {} and {} characters long.",
      field, min, max
    )));
  }
  Ok(())
}

/// Validated product ready for storage.
#[derive(Debug, Clone)]
pub struct NewProduct {
  pub name: String,
  pub short_description: String,
  pub full_description: String,
  pub price_cents: i64,
  pub amount: i32,
  pub discount: i32,
  pub brand_id: Uuid,
  pub category_id: Uuid,
}

impl NewProduct {
  pub fn from_draft(draft: ProductDraft, brand_id: Uuid, category_id: Uuid) -> Self {
    Self {
      name: draft.name.trim().to_string(),
      short_description: draft.short_description.trim().to_string(),
      full_description: draft.full_description.trim().to_string(),
      price_cents: draft.price_cents,
      amount: draft.amount,
      discount: draft.discount,
      brand_id,
      category_id,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draft() -> ProductDraft {
    ProductDraft {
      name: "Trail runner".to_string(),
      short_description: "Light shoe for rough ground".to_string(),
      full_description: "x".repeat(80),
      price_cents: 12_999,
      amount: 10,
      discount: 15,
      brand_name: "Acme".to_string(),
      category_name: "Shoes".to_string(),
    }
  }

  #[test]
  fn discount_price_matches_rounded_percentage_for_every_discount() {
    for price_cents in [1_i64, 99, 1_000, 12_345, 99_999, 100_000_000] {
      for discount in 0..=DISCOUNT_MAX {
        // Exact value in hundredths of a cent.
        let exact = price_cents * (100 - i64::from(discount));
        let got = discount_price_cents(price_cents, discount);
        let error = got * 100 - exact;
        assert!(
          (-49..=50).contains(&error),
          "price {price_cents} discount {discount}: got {got}, exact {exact}/100"
        );
      }
    }
  }

  #[test]
  fn discount_price_examples() {
    assert_eq!(discount_price_cents(1_000, 0), 1_000);
    assert_eq!(discount_price_cents(1_000, 25), 750);
    assert_eq!(discount_price_cents(999, 50), 500);
    assert_eq!(discount_price_cents(1, 99), 0);
  }

  #[test]
  fn draft_validation_enforces_ranges() {
    assert!(draft().validate().is_ok());

    let mut d = draft();
    d.price_cents = 0;
    assert!(d.validate().is_err());

    let mut d = draft();
    d.discount = 100;
    assert!(d.validate().is_err());

    let mut d = draft();
    d.amount = -1;
    assert!(d.validate().is_err());

    let mut d = draft();
    d.short_description = "too short".to_string();
    assert!(d.validate().is_err());
  }
}
