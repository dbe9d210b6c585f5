// storefront/src/models/token.rs

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
  ConfirmEmail,
  ResetPassword,
}

impl TokenPurpose {
  pub fn as_str(self) -> &'static str {
    match self {
      TokenPurpose::ConfirmEmail => "confirm_email",
      TokenPurpose::ResetPassword => "reset_password",
    }
  }
}

impl fmt::Display for TokenPurpose {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TokenPurpose {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "confirm_email" => Ok(TokenPurpose::ConfirmEmail),
      "reset_password" => Ok(TokenPurpose::ResetPassword),
      other => Err(format!("unknown token purpose '{}'", other)),
    }
  }
}

/// One-time token mailed to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountToken {
  pub token: String,
  pub user_id: Uuid,
  pub purpose: TokenPurpose,
  pub expires_at: DateTime<Utc>,
}

impl AccountToken {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}
