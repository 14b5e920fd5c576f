//! Forno storefront library.
//!
//! The public JSON API: menu, search, delivery checks, order placement and
//! public content. The binary in `main.rs` wires these modules together.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod search;
pub mod services;
pub mod state;
