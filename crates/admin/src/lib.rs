//! Forno Admin library.
//!
//! This module exposes the admin components for use in tests and the binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
pub mod storage;
