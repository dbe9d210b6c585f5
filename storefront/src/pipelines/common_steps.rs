// storefront/src/pipelines/common_steps.rs

//! Pieces shared by several flows: token issue and lookup, mail dispatch,
//! password replacement.

use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{AccountToken, TokenPurpose};
use crate::services::auth_service;
use crate::services::mailer::{OutgoingMail, SentMail};
use crate::state::AppState;

/// Stores a fresh token valid for the configured lifetime.
#[instrument(name = "common_step::issue_token", skip(app_state), err(Display))]
pub async fn issue_token(app_state: &AppState, user_id: Uuid, purpose: TokenPurpose) -> AppResult<String> {
  let token = AccountToken {
    token: auth_service::generate_token(),
    user_id,
    purpose,
    expires_at: Utc::now() + Duration::seconds(app_state.config.token_ttl_secs),
  };
  app_state.users.store_token(&token).await?;
  info!(%user_id, %purpose, "Account token issued.");
  Ok(token.token)
}

/// Looks a token up; unknown and expired tokens both fail with `invalid_message`.
#[instrument(name = "common_step::resolve_token", skip(app_state, token, invalid_message), err(Display))]
pub async fn resolve_token(
  app_state: &AppState,
  token: &str,
  purpose: TokenPurpose,
  invalid_message: &str,
) -> AppResult<AccountToken> {
  match app_state.users.find_token(token, purpose).await? {
    Some(found) if !found.is_expired_at(Utc::now()) => Ok(found),
    Some(found) => {
      warn!(user_id = %found.user_id, %purpose, "Expired account token presented.");
      Err(AppError::Validation(invalid_message.to_string()))
    }
    None => Err(AppError::Validation(invalid_message.to_string())),
  }
}

#[instrument(name = "common_step::send_mail", skip(app_state, mail), fields(to = %mail.to, subject = %mail.subject), err(Display))]
pub async fn send_mail_step(app_state: &AppState, mail: OutgoingMail) -> AppResult<SentMail> {
  match app_state.mailer.send(&mail).await {
    Ok(sent) => {
      info!(message_id = %sent.message_id, "Mail sent.");
      Ok(sent)
    }
    Err(e) => {
      warn!(error = %e, "Mail could not be sent.");
      Err(e)
    }
  }
}

/// Hashes and stores a new password.
pub async fn store_password(app_state: &AppState, user_id: Uuid, password: &str) -> AppResult<()> {
  let hash = auth_service::hash_password(password)?;
  app_state.users.set_password_hash(user_id, &hash).await?;
  info!(%user_id, "Password updated.");
  Ok(())
}
