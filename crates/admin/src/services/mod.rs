//! Admin services that coordinate more than one backend.

pub mod catalog;
pub mod order_stream;

pub use catalog::{CatalogError, CatalogService, DeleteSummary};
pub use order_stream::{ORDER_CHANNEL, spawn_order_listener};
