//! Derived views over an order snapshot.
//!
//! Everything here is a pure function of its inputs: no state is kept
//! between calls, so views can be recomputed on every snapshot or criteria
//! change.

pub mod aggregate;
pub mod export;
pub mod filter;

pub use aggregate::aggregate;
pub use export::{export_csv, export_file_name};
pub use filter::{filter_orders, OrderFilter};
