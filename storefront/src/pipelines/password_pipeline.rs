// storefront/src/pipelines/password_pipeline.rs

//! Forgotten-password mail, reset by token, and the logged-in password change.

use storefront_flow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::TokenPurpose;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{PasswordResetCtxData, PasswordResetRequestCtxData, UpdatePasswordCtxData};
use crate::services::{auth_service, mailer};

pub const NO_SUCH_ACCOUNT: &str = "There is no account with that email. You must register first.";
pub const RESET_LINK_INVALID: &str = "That is an invalid or expired token";
pub const INVALID_PASSWORD: &str = "Invalid password";

pub fn register_password_reset_request_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut request_p = Pipeline::<PasswordResetRequestCtxData, AppError>::new(&[
    ("load_account", false, None),
    ("issue_reset_token", false, None),
    ("send_reset_email", false, None),
  ]);

  request_p.on_root("load_account", |ctx_data: ContextData<PasswordResetRequestCtxData>| {
    Box::pin(async move {
      let (email, users) = {
        let guard = ctx_data.read();
        (guard.email.trim().to_string(), guard.app_state.users.clone())
      };
      auth_service::check_email(&email)?;

      let Some(user) = users.find_user_by_email(&email).await? else {
        warn!(%email, "Password reset for unknown email.");
        return Err(AppError::Validation(NO_SUCH_ACCOUNT.to_string()));
      };
      let mut guard = ctx_data.write();
      guard.email = email;
      guard.user = Some(user);
      Ok(PipelineControl::Continue)
    })
  })?;

  request_p.on_root("issue_reset_token", |ctx_data: ContextData<PasswordResetRequestCtxData>| {
    Box::pin(async move {
      let (app_state, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user.as_ref().map(|u| u.id))
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("User missing before token issue".to_string()))?;

      let token = common_steps::issue_token(&app_state, user_id, TokenPurpose::ResetPassword).await?;
      ctx_data.write().reset_token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  request_p.on_root("send_reset_email", |ctx_data: ContextData<PasswordResetRequestCtxData>| {
    Box::pin(async move {
      let (app_state, email, token) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.email.clone(), guard.reset_token.clone())
      };
      let token = token.ok_or_else(|| AppError::Internal("Reset token missing".to_string()))?;

      let mail = mailer::reset_password_mail(&app_state.config, &email, &token);
      common_steps::send_mail_step(&app_state, mail).await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(request_p);
  info!("Password reset request pipeline registered.");
  Ok(())
}

pub fn register_password_reset_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut reset_p = Pipeline::<PasswordResetCtxData, AppError>::new(&[
    ("resolve_reset_token", false, None),
    ("validate_new_password", false, None),
    ("store_password", false, None),
    ("revoke_reset_tokens", false, None),
  ]);

  reset_p.on_root("resolve_reset_token", |ctx_data: ContextData<PasswordResetCtxData>| {
    Box::pin(async move {
      let (app_state, token) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.token.clone())
      };

      let found = common_steps::resolve_token(&app_state, &token, TokenPurpose::ResetPassword, RESET_LINK_INVALID).await?;
      ctx_data.write().user_id = Some(found.user_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  reset_p.on_root("validate_new_password", |ctx_data: ContextData<PasswordResetCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      auth_service::check_new_password(&guard.password, &guard.confirm_password)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  reset_p.on_root("store_password", |ctx_data: ContextData<PasswordResetCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, password) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.password.clone())
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("User id missing".to_string()))?;

      common_steps::store_password(&app_state, user_id, &password).await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  reset_p.on_root("revoke_reset_tokens", |ctx_data: ContextData<PasswordResetCtxData>| {
    Box::pin(async move {
      let (users, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.users.clone(), guard.user_id)
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("User id missing".to_string()))?;

      let revoked = users.revoke_tokens(user_id, TokenPurpose::ResetPassword).await?;
      info!(%user_id, revoked, "Reset tokens revoked.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(reset_p);
  info!("Password reset pipeline registered.");
  Ok(())
}

pub fn register_update_password_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut update_p = Pipeline::<UpdatePasswordCtxData, AppError>::new(&[
    ("validate_new_password", false, None),
    ("load_password_hash", false, None),
    ("verify_current_password", false, None),
    ("store_password", false, None),
  ]);

  update_p.on_root("validate_new_password", |ctx_data: ContextData<UpdatePasswordCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      auth_service::check_new_password(&guard.new_password, &guard.confirm_password)?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  update_p.on_root("load_password_hash", |ctx_data: ContextData<UpdatePasswordCtxData>| {
    Box::pin(async move {
      let (users, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.users.clone(), guard.user_id)
      };

      let user = users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
      ctx_data.write().stored_hash = Some(user.password_hash);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  update_p.on_root("verify_current_password", |ctx_data: ContextData<UpdatePasswordCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let hash = guard
        .stored_hash
        .as_deref()
        .ok_or_else(|| AppError::Internal("Password hash missing".to_string()))?;
      if !auth_service::verify_password(hash, &guard.current_password)? {
        return Err(AppError::Validation(INVALID_PASSWORD.to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  update_p.on_root("store_password", |ctx_data: ContextData<UpdatePasswordCtxData>| {
    Box::pin(async move {
      let (app_state, user_id, password) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.user_id, guard.new_password.clone())
      };

      common_steps::store_password(&app_state, user_id, &password).await?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(update_p);
  info!("Password update pipeline registered.");
  Ok(())
}
