//! Core types for Forno.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod brand;
pub mod contact;
pub mod id;
pub mod price;
pub mod status;

pub use brand::Brand;
pub use contact::{PhoneError, PhoneNumber};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
