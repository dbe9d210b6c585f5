// storefront/src/pipelines/signup_pipeline.rs

use storefront_flow::{ContextData, FlowResult, Pipeline, PipelineControl, Registry};
use tracing::{event, info, warn, Level};

use crate::errors::AppError;
use crate::models::{NewUser, TokenPurpose};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{ConfirmEmailCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::services::mailer;

pub const USERNAME_TAKEN: &str = "That username is taken. Please choose a different one.";
pub const EMAIL_TAKEN: &str = "That email is taken. Please choose a different one.";
pub const CONFIRM_LINK_INVALID: &str = "The confirmation link is invalid or has expired.";

/// Registers the sign-up flow.
pub fn register_signup_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user", false, None),
    ("create_user", false, None),
    ("issue_confirmation_token", false, None),
    ("send_confirmation_email", true, None),
  ]);

  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (username, email, password, confirm) = {
        let guard = ctx_data.read();
        (
          guard.username.trim().to_string(),
          guard.email.trim().to_string(),
          guard.password.clone(),
          guard.confirm_password.clone(),
        )
      };

      event!(Level::DEBUG, %email, "Validating signup input.");
      auth_service::check_username(&username)?;
      auth_service::check_email(&email)?;
      auth_service::check_new_password(&password, &confirm)?;

      {
        let mut guard = ctx_data.write();
        guard.username = username;
        guard.email = email;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  signup_p.on_root("check_existing_user", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (username, email, users) = {
        let guard = ctx_data.read();
        (guard.username.clone(), guard.email.clone(), guard.app_state.users.clone())
      };

      if users.find_user_by_username(&username).await?.is_some() {
        warn!(%username, "Signup with a taken username.");
        return Err(AppError::Validation(USERNAME_TAKEN.to_string()));
      }
      if users.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "Signup with a taken email.");
        return Err(AppError::Validation(EMAIL_TAKEN.to_string()));
      }
      Ok(PipelineControl::Continue)
    })
  })?;

  signup_p.on_root("create_user", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (username, email, password, users) = {
        let guard = ctx_data.read();
        (
          guard.username.clone(),
          guard.email.clone(),
          guard.password.clone(),
          guard.app_state.users.clone(),
        )
      };

      let password_hash = auth_service::hash_password(&password)?;
      let user = users
        .create_user(NewUser {
          username,
          email,
          password_hash,
          confirmed: false,
          is_superuser: false,
        })
        .await?;
      info!(user_id = %user.id, "User created.");
      ctx_data.write().created_user = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  signup_p.on_root("issue_confirmation_token", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (app_state, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.created_user.as_ref().map(|u| u.id))
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("User missing after creation".to_string()))?;

      let token = common_steps::issue_token(&app_state, user_id, TokenPurpose::ConfirmEmail).await?;
      ctx_data.write().confirm_token = Some(token);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  // Optional: a failed send leaves the account in place.
  signup_p.on_root("send_confirmation_email", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (app_state, email, token) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.email.clone(), guard.confirm_token.clone())
      };
      let Some(token) = token else {
        warn!(%email, "No confirmation token to send.");
        return Ok(PipelineControl::Continue);
      };

      let mail = mailer::confirmation_mail(&app_state.config, &email, &token);
      common_steps::send_mail_step(&app_state, mail).await?;
      ctx_data.write().confirmation_sent = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(signup_p);
  info!("Sign-up pipeline registered.");
  Ok(())
}

/// Registers the email confirmation flow.
pub fn register_confirm_email_pipeline(registry: &Registry<AppError>) -> FlowResult<()> {
  let mut confirm_p = Pipeline::<ConfirmEmailCtxData, AppError>::new(&[
    ("resolve_confirmation_token", false, None),
    ("load_user", false, None),
    (
      "mark_confirmed",
      false,
      Some(std::sync::Arc::new(|ctx: ContextData<ConfirmEmailCtxData>| ctx.read().already_confirmed)),
    ),
  ]);

  confirm_p.on_root("resolve_confirmation_token", |ctx_data: ContextData<ConfirmEmailCtxData>| {
    Box::pin(async move {
      let (app_state, token) = {
        let guard = ctx_data.read();
        (guard.app_state.clone(), guard.token.clone())
      };

      let found = common_steps::resolve_token(&app_state, &token, TokenPurpose::ConfirmEmail, CONFIRM_LINK_INVALID).await?;
      ctx_data.write().user_id = Some(found.user_id);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  confirm_p.on_root("load_user", |ctx_data: ContextData<ConfirmEmailCtxData>| {
    Box::pin(async move {
      let (users, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.users.clone(), guard.user_id)
      };
      let user_id = user_id.ok_or_else(|| AppError::Validation(CONFIRM_LINK_INVALID.to_string()))?;

      let user = users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
      ctx_data.write().already_confirmed = user.confirmed;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  confirm_p.on_root("mark_confirmed", |ctx_data: ContextData<ConfirmEmailCtxData>| {
    Box::pin(async move {
      let (users, user_id) = {
        let guard = ctx_data.read();
        (guard.app_state.users.clone(), guard.user_id)
      };
      let user_id = user_id.ok_or_else(|| AppError::Internal("User id missing".to_string()))?;

      users.set_confirmed(user_id).await?;
      users.revoke_tokens(user_id, TokenPurpose::ConfirmEmail).await?;
      info!(%user_id, "Account confirmed.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  })?;

  registry.register_pipeline(confirm_p);
  info!("Email confirmation pipeline registered.");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::repositories::memory::seed_user;
  use crate::state::testing::in_memory;
  use crate::state::AppState;
  use storefront_flow::PipelineResult;

  fn signup_ctx(state: &AppState, username: &str, email: &str) -> SignupCtxData {
    SignupCtxData {
      app_state: state.clone(),
      username: username.to_string(),
      email: email.to_string(),
      password: "pw-123456".to_string(),
      confirm_password: "pw-123456".to_string(),
      created_user: None,
      confirm_token: None,
      confirmation_sent: false,
    }
  }

  fn confirm_ctx(state: &AppState, token: &str) -> ConfirmEmailCtxData {
    ConfirmEmailCtxData {
      app_state: state.clone(),
      token: token.to_string(),
      user_id: None,
      already_confirmed: false,
    }
  }

  #[tokio::test]
  async fn signup_creates_unconfirmed_user_and_mails_link() {
    let (state, store, mailer) = in_memory();
    let ctx = ContextData::new(signup_ctx(&state, " jo ", "jo@example.com"));

    let result = state.flows.run(ctx.clone()).await.unwrap();

    assert_eq!(result, PipelineResult::Completed);
    let user = store.user_by_email("jo@example.com").expect("stored user");
    assert_eq!(user.username, "jo");
    assert!(!user.confirmed);
    assert!(ctx.read().confirmation_sent);
    let token = mailer.last_token_for("jo@example.com").expect("mailed token");
    assert_eq!(ctx.read().confirm_token.as_deref(), Some(token.as_str()));
  }

  #[tokio::test]
  async fn signup_survives_mail_failure() {
    let (state, store, mailer) = in_memory();
    mailer.set_failing(true);
    let ctx = ContextData::new(signup_ctx(&state, "jo", "jo@example.com"));

    assert_eq!(state.flows.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);
    assert!(!ctx.read().confirmation_sent);
    assert!(store.user_by_email("jo@example.com").is_some());
  }

  #[tokio::test]
  async fn signup_rejects_taken_names() {
    let (state, _store, _mailer) = in_memory();
    state.flows.run(ContextData::new(signup_ctx(&state, "jo", "jo@example.com"))).await.unwrap();

    let name = state.flows.run(ContextData::new(signup_ctx(&state, "jo", "other@example.com"))).await;
    assert!(matches!(name, Err(AppError::Validation(ref m)) if m == USERNAME_TAKEN), "got {name:?}");

    let email = state.flows.run(ContextData::new(signup_ctx(&state, "other", "jo@example.com"))).await;
    assert!(matches!(email, Err(AppError::Validation(ref m)) if m == EMAIL_TAKEN), "got {email:?}");
  }

  #[tokio::test]
  async fn signup_rejects_mismatched_passwords() {
    let (state, store, _mailer) = in_memory();
    let mut data = signup_ctx(&state, "jo", "jo@example.com");
    data.confirm_password = "different".to_string();

    let result = state.flows.run(ContextData::new(data)).await;

    assert!(matches!(result, Err(AppError::Validation(_))), "got {result:?}");
    assert!(store.user_by_email("jo@example.com").is_none());
  }

  #[tokio::test]
  async fn confirmation_marks_user_once() {
    let (state, store, mailer) = in_memory();
    state.flows.run(ContextData::new(signup_ctx(&state, "jo", "jo@example.com"))).await.unwrap();
    let token = mailer.last_token_for("jo@example.com").unwrap();

    let first = ContextData::new(confirm_ctx(&state, &token));
    assert_eq!(state.flows.run(first.clone()).await.unwrap(), PipelineResult::Completed);
    assert!(!first.read().already_confirmed);
    let user = store.user_by_email("jo@example.com").unwrap();
    assert!(user.confirmed);
    assert!(store.tokens_for(user.id, TokenPurpose::ConfirmEmail).is_empty());

    // The link was consumed.
    let reused = state.flows.run(ContextData::new(confirm_ctx(&state, &token))).await;
    assert!(matches!(reused, Err(AppError::Validation(ref m)) if m == CONFIRM_LINK_INVALID), "got {reused:?}");
  }

  #[tokio::test]
  async fn confirmation_of_confirmed_account_skips_update() {
    let (state, store, _mailer) = in_memory();
    let user = seed_user(&store, "jo", "jo@example.com", true).await;
    let token = common_steps::issue_token(&state, user.id, TokenPurpose::ConfirmEmail).await.unwrap();

    let ctx = ContextData::new(confirm_ctx(&state, &token));
    assert_eq!(state.flows.run(ctx.clone()).await.unwrap(), PipelineResult::Completed);

    assert!(ctx.read().already_confirmed);
    assert_eq!(store.tokens_for(user.id, TokenPurpose::ConfirmEmail).len(), 1);
  }

  #[tokio::test]
  async fn expired_confirmation_link_is_rejected() {
    let (state, store, _mailer) = in_memory();
    let user = seed_user(&store, "jo", "jo@example.com", false).await;
    let token = common_steps::issue_token(&state, user.id, TokenPurpose::ConfirmEmail).await.unwrap();
    store.expire_tokens(user.id);

    let result = state.flows.run(ContextData::new(confirm_ctx(&state, &token))).await;

    assert!(matches!(result, Err(AppError::Validation(ref m)) if m == CONFIRM_LINK_INVALID), "got {result:?}");
    assert!(!store.user_by_email("jo@example.com").unwrap().confirmed);
  }
}
