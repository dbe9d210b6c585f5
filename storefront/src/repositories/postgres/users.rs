// storefront/src/repositories/postgres/users.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, FromRow, PgPool};
use uuid::Uuid;

use crate::models::{AccountToken, NewUser, TokenPurpose, User};
use crate::repositories::{StoreError, StoreResult, UserRepository};

const USER_COLUMNS: &str = "id, username, email, password_hash, confirmed, is_superuser, created_at";

#[derive(Debug, Clone)]
pub struct PgUserRepository {
  pool: PgPool,
}

impl PgUserRepository {
  #[must_use]
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn find_by(&self, column: &str, value: &str) -> StoreResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
    Ok(query_as::<_, User>(&sql).bind(value).fetch_optional(&self.pool).await?)
  }
}

#[derive(FromRow)]
struct TokenRow {
  token: String,
  user_id: Uuid,
  purpose: String,
  expires_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for AccountToken {
  type Error = StoreError;

  fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
    let purpose = row
      .purpose
      .parse::<TokenPurpose>()
      .map_err(|e| StoreError::Sql(sqlx::Error::Decode(e.into())))?;
    Ok(Self {
      token: row.token,
      user_id: row.user_id,
      purpose,
      expires_at: row.expires_at,
    })
  }
}

#[async_trait]
impl UserRepository for PgUserRepository {
  async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    Ok(query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
    self.find_by("email", email).await
  }

  async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
    self.find_by("username", username).await
  }

  async fn create_user(&self, user: NewUser) -> StoreResult<User> {
    let sql = format!(
      "INSERT INTO users (id, username, email, password_hash, confirmed, is_superuser) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      USER_COLUMNS
    );
    let created = query_as::<_, User>(&sql)
      .bind(Uuid::new_v4())
      .bind(&user.username)
      .bind(&user.email)
      .bind(&user.password_hash)
      .bind(user.confirmed)
      .bind(user.is_superuser)
      .fetch_one(&self.pool)
      .await;
    created.map_err(|e| match StoreError::from(e) {
      StoreError::AlreadyExists(constraint) if constraint.contains("username") => {
        StoreError::AlreadyExists("User with such username".to_string())
      }
      StoreError::AlreadyExists(_) => StoreError::AlreadyExists("User with such email".to_string()),
      other => other,
    })
  }

  async fn set_confirmed(&self, id: Uuid) -> StoreResult<()> {
    let done = query("UPDATE users SET confirmed = TRUE WHERE id = $1").bind(id).execute(&self.pool).await?;
    if done.rows_affected() == 0 {
      return Err(StoreError::NotFound("User".to_string()));
    }
    Ok(())
  }

  async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
    let done = query("UPDATE users SET password_hash = $2 WHERE id = $1")
      .bind(id)
      .bind(password_hash)
      .execute(&self.pool)
      .await?;
    if done.rows_affected() == 0 {
      return Err(StoreError::NotFound("User".to_string()));
    }
    Ok(())
  }

  async fn store_token(&self, token: &AccountToken) -> StoreResult<()> {
    query("INSERT INTO account_tokens (token, user_id, purpose, expires_at) VALUES ($1, $2, $3, $4)")
      .bind(&token.token)
      .bind(token.user_id)
      .bind(token.purpose.as_str())
      .bind(token.expires_at)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn find_token(&self, token: &str, purpose: TokenPurpose) -> StoreResult<Option<AccountToken>> {
    let row = query_as::<_, TokenRow>(
      "SELECT token, user_id, purpose, expires_at FROM account_tokens WHERE token = $1 AND purpose = $2",
    )
    .bind(token)
    .bind(purpose.as_str())
    .fetch_optional(&self.pool)
    .await?;
    row.map(AccountToken::try_from).transpose()
  }

  async fn revoke_tokens(&self, user_id: Uuid, purpose: TokenPurpose) -> StoreResult<u64> {
    let done = query("DELETE FROM account_tokens WHERE user_id = $1 AND purpose = $2")
      .bind(user_id)
      .bind(purpose.as_str())
      .execute(&self.pool)
      .await?;
    Ok(done.rows_affected())
  }
}
