//! Sillage storefront cart service.
//!
//! A JSON API over the visitor's cart. Carts live in the session; every
//! request hydrates a [`sillage_core::CartStore`] from it and flushes the
//! result back.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::router;
pub use state::AppState;
