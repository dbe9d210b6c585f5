// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  /// Prefix for links placed in account mails.
  pub app_base_url: String,
  pub mail_sender: String,
  /// Lifetime of confirmation and reset tokens.
  pub token_ttl_secs: i64,
  /// Idle time after which a session ends and its cart is released.
  pub session_ttl_secs: u64,
  pub seed_db: bool,
  pub log_format: LogFormat,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL")
      .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port))
      .trim_end_matches('/')
      .to_string();
    let mail_sender = get_env("MAIL_SENDER").unwrap_or_else(|_| "noreply@example.com".to_string());

    let token_ttl_secs = get_env("TOKEN_TTL_SECS")
      .unwrap_or_else(|_| "3600".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid TOKEN_TTL_SECS: {}", e)))?;
    if token_ttl_secs <= 0 {
      return Err(AppError::Config("TOKEN_TTL_SECS must be positive".to_string()));
    }

    let session_ttl_secs = get_env("SESSION_TTL_SECS")
      .unwrap_or_else(|_| "1800".to_string())
      .parse::<u64>()
      .map_err(|e| AppError::Config(format!("Invalid SESSION_TTL_SECS: {}", e)))?;
    if session_ttl_secs == 0 {
      return Err(AppError::Config("SESSION_TTL_SECS must be positive".to_string()));
    }

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    let log_format = match get_env("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()).as_str() {
      "text" => LogFormat::Text,
      "json" => LogFormat::Json,
      other => return Err(AppError::Config(format!("Invalid LOG_FORMAT: {}", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      mail_sender,
      token_ttl_secs,
      session_ttl_secs,
      seed_db,
      log_format,
    })
  }

  pub fn session_ttl(&self) -> std::time::Duration {
    std::time::Duration::from_secs(self.session_ttl_secs)
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }

  #[cfg(test)]
  pub(crate) fn for_tests() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: "postgres://localhost/storefront_test".to_string(),
      app_base_url: "http://shop.test".to_string(),
      mail_sender: "noreply@shop.test".to_string(),
      token_ttl_secs: 3600,
      session_ttl_secs: 1800,
      seed_db: false,
      log_format: LogFormat::Text,
    }
  }
}
