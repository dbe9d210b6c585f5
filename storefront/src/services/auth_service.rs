// storefront/src/services/auth_service.rs

//! Password hashing, credential rules and one-time token generation.

use crate::errors::AppError;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use rand_core::RngCore;
use tracing::{debug, error, instrument};

pub const USERNAME_MIN: usize = 2;
pub const USERNAME_MAX: usize = 16;
pub const EMAIL_MAX: usize = 120;

/// Hashes a plain-text password with Argon2 and a fresh salt.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String, AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password is required.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  match Argon2::default().hash_password(password.as_bytes(), &salt) {
    Ok(hash) => {
      debug!("Password hashed successfully.");
      Ok(hash.to_string())
    }
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Checks a password against a stored hash; `Ok(false)` on mismatch.
#[instrument(
  name = "auth_service::verify_password",
  skip(hashed_password, provided_password),
  err(Display),
  fields(hash_len = hashed_password.len())
)]
pub fn verify_password(hashed_password: &str, provided_password: &str) -> Result<bool, AppError> {
  if provided_password.is_empty() {
    return Ok(false);
  }

  let parsed_hash = PasswordHash::new(hashed_password).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => {
      debug!("Password verification failed: passwords do not match.");
      Ok(false)
    }
    Err(other) => {
      error!(error = %other, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!("Password verification process failed: {}", other)))
    }
  }
}

/// A new password must be present and typed twice the same way.
pub fn check_new_password(password: &str, confirm_password: &str) -> Result<(), AppError> {
  if password.is_empty() {
    return Err(AppError::Validation("Password is required.".to_string()));
  }
  if password != confirm_password {
    return Err(AppError::Validation("Passwords must match.".to_string()));
  }
  Ok(())
}

pub fn check_username(username: &str) -> Result<(), AppError> {
  let len = username.chars().count();
  if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
    return Err(AppError::Validation(format!(
      "Username must be between {} and {} characters long.",
      USERNAME_MIN, USERNAME_MAX
    )));
  }
  Ok(())
}

pub fn check_email(email: &str) -> Result<(), AppError> {
  let Some((local, domain)) = email.split_once('@') else {
    return Err(AppError::Validation("Valid email is required.".to_string()));
  };
  if local.is_empty() || domain.is_empty() || email.len() > EMAIL_MAX || email.contains(char::is_whitespace) {
    return Err(AppError::Validation("Valid email is required.".to_string()));
  }
  Ok(())
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
