//! Utility functions for timestamps, identifiers and display formatting.
//!
//! The order API does not pin down a single timestamp representation, so
//! parsing here is deliberately lenient about the shapes it accepts.

pub mod formatting;
pub mod identifier;
pub mod timestamp;

pub use formatting::{status_label, truncate_id};
pub use identifier::deserialize_id;
pub use timestamp::parse_timestamp;
