//! HTTP endpoint handlers.

pub mod orders;
