// storefront/src/seed.rs

//! Startup seeding: an admin account and a random demo catalog.

use rand_core::{OsRng, RngCore};
use tracing::{info, instrument};

use crate::errors::Result;
use crate::models::{NewProduct, NewUser, Taxonomy};
use crate::services::auth_service;
use crate::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@admin.admin";
const ADMIN_PASSWORD: &str = "admin";

const BRANDS: [&str; 5] = ["Northwind", "Bluepeak", "Ironbark", "Solstice", "Kestrel"];
const CATEGORIES: [&str; 4] = ["Footwear", "Outerwear", "Backpacks", "Accessories"];
const ADJECTIVES: [&str; 8] = ["Classic", "Rugged", "Urban", "Alpine", "Compact", "Vintage", "Swift", "Sturdy"];
const NOUNS: [&str; 8] = ["Boot", "Jacket", "Pack", "Cap", "Glove", "Runner", "Parka", "Belt"];
const PRODUCTS_PER_SEED: usize = 24;

fn pick<'a>(rng: &mut OsRng, items: &[&'a str]) -> &'a str {
  items[rng.next_u32() as usize % items.len()]
}

fn between(rng: &mut OsRng, low: u32, high: u32) -> u32 {
  low + rng.next_u32() % (high - low + 1)
}

/// Creates whatever is missing; safe to run on every start.
#[instrument(name = "seed::seed_database", skip(state), err(Display))]
pub async fn seed_database(state: &AppState) -> Result<()> {
  if state.users.find_user_by_email(ADMIN_EMAIL).await?.is_none() {
    state
      .users
      .create_user(NewUser {
        username: ADMIN_USERNAME.to_string(),
        email: ADMIN_EMAIL.to_string(),
        password_hash: auth_service::hash_password(ADMIN_PASSWORD)?,
        confirmed: true,
        is_superuser: true,
      })
      .await?;
    info!("Admin account created.");
  }

  let mut brand_ids = Vec::with_capacity(BRANDS.len());
  for name in BRANDS {
    let label = match state.catalog.find_label_by_name(Taxonomy::Brand, name).await? {
      Some(label) => label,
      None => state.catalog.create_label(Taxonomy::Brand, name).await?,
    };
    brand_ids.push(label.id);
  }
  let mut category_ids = Vec::with_capacity(CATEGORIES.len());
  for name in CATEGORIES {
    let label = match state.catalog.find_label_by_name(Taxonomy::Category, name).await? {
      Some(label) => label,
      None => state.catalog.create_label(Taxonomy::Category, name).await?,
    };
    category_ids.push(label.id);
  }

  let mut rng = OsRng;
  let mut created = 0;
  for _ in 0..PRODUCTS_PER_SEED {
    let name = format!("{} {} {}", pick(&mut rng, &BRANDS), pick(&mut rng, &ADJECTIVES), pick(&mut rng, &NOUNS));
    if state.catalog.find_product_by_name(&name).await?.is_some() {
      continue;
    }
    let product = NewProduct {
      short_description: format!("The {} for everyday use.", name),
      full_description: format!(
        "The {} is made from durable materials, tested outdoors and backed by a two year warranty.",
        name
      ),
      price_cents: i64::from(between(&mut rng, 500, 50_000)),
      amount: between(&mut rng, 0, 100) as i32,
      discount: [0, 0, 5, 10, 25][rng.next_u32() as usize % 5],
      brand_id: brand_ids[rng.next_u32() as usize % brand_ids.len()],
      category_id: category_ids[rng.next_u32() as usize % category_ids.len()],
      name,
    };
    state.catalog.create_product(product).await?;
    created += 1;
  }
  info!(products = created, "Catalog seeded.");
  Ok(())
}
