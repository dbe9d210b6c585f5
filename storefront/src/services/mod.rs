// storefront/src/services/mod.rs

//! Domain operations over the repository traits.

pub mod auth_service;
pub mod cart;
pub mod catalog;
pub mod mailer;
pub mod orders;
