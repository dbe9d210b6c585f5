// storefront/src/lib.rs

//! Storefront service: catalog, reserving cart, orders and accounts over
//! JSON/HTTP.

pub mod config;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod pipelines;
pub mod repositories;
pub mod seed;
pub mod services;
pub mod sessions;
pub mod state;
pub mod web;
