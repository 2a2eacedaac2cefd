//! Common types for the order desk.
//!
//! This crate defines the data model shared by the store backends, the sync
//! and derived-view engine, and the HTTP service.

/// API types for HTTP endpoints.
pub mod api;
/// Event types for in-process change notification.
pub mod events;
/// Filter criteria for the derived order view.
pub mod filter;
/// The order record and its enumerations.
pub mod order;
/// Implementation registry trait.
pub mod registry;
/// Aggregate statistics.
pub mod stats;
/// Formatting helpers.
pub mod utils;
/// Configuration validation types.
pub mod validation;

pub use api::*;
pub use events::*;
pub use filter::*;
pub use order::*;
pub use registry::*;
pub use stats::*;
pub use utils::truncate_id;
pub use validation::*;
