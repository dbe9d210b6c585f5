// storefront/src/models/label.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::{AppError, Result};

pub const LABEL_NAME_MIN: usize = 2;
pub const LABEL_NAME_MAX: usize = 64;

/// Brands and categories share one shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
  Brand,
  Category,
}

impl Taxonomy {
  pub fn table(self) -> &'static str {
    match self {
      Taxonomy::Brand => "brands",
      Taxonomy::Category => "categories",
    }
  }

  /// Inverse of [`Taxonomy::table`]; also the URL segment.
  pub fn from_table(name: &str) -> Option<Self> {
    match name {
      "brands" => Some(Taxonomy::Brand),
      "categories" => Some(Taxonomy::Category),
      _ => None,
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Taxonomy::Brand => "Brand",
      Taxonomy::Category => "Category",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Label {
  pub id: Uuid,
  pub name: String,
}

/// Trims and checks a brand or category name.
pub fn validate_label_name(kind: Taxonomy, name: &str) -> Result<String> {
  let name = name.trim();
  let len = name.chars().count();
  if !(LABEL_NAME_MIN..=LABEL_NAME_MAX).contains(&len) {
    return Err(AppError::Validation(format!(
      "{} name must be between {} and {} characters long.",
      kind.title(),
      LABEL_NAME_MIN,
      LABEL_NAME_MAX
    )));
  }
  Ok(name.to_string())
}
