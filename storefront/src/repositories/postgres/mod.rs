// storefront/src/repositories/postgres/mod.rs

mod catalog;
mod orders;
mod users;

pub use catalog::PgCatalogRepository;
pub use orders::PgOrderRepository;
pub use users::PgUserRepository;

use sqlx::PgPool;

const SCHEMA_SQL: &str = include_str!("../../../schema.sql");

/// Creates missing tables and indexes.
#[tracing::instrument(name = "db::apply_schema", skip(pool), err(Display))]
pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
  sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
  tracing::info!("Database schema is up to date.");
  Ok(())
}
