// storefront/src/models/user.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub confirmed: bool,
  pub is_superuser: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub confirmed: bool,
  pub is_superuser: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
  pub id: Uuid,
  pub username: String,
  pub email: String,
  pub is_superuser: bool,
}

impl From<&User> for UserView {
  fn from(u: &User) -> Self {
    Self {
      id: u.id,
      username: u.username.clone(),
      email: u.email.clone(),
      is_superuser: u.is_superuser,
    }
  }
}
