// storefront/src/models/mod.rs

//! Persistent entities of the storefront.

pub mod label;
pub mod order;
pub mod product;
pub mod token;
pub mod user;

pub use label::{Label, Taxonomy};
pub use order::{Order, OrderLine, OrderView};
pub use product::{discount_price_cents, NewProduct, Product, ProductDraft, ProductFilter, ProductView};
pub use token::{AccountToken, TokenPurpose};
pub use user::{NewUser, User, UserView};
