// server/src/lib.rs

//! Storefront HTTP server: products, carts, orders, reviews and hosted checkout.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod query;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
