//! Common types module for the order tracker.
//!
//! This module defines the data types shared by every tracker component:
//! orders and live order events, status filters, the session token, the
//! request/response payloads of the order API, and the configuration
//! validation framework used by pluggable implementations.

/// API payloads for the order snapshot, status and creation endpoints.
pub mod api;
/// Status filters and the status option domain.
pub mod filter;
/// Orders, order statuses and live order events.
pub mod order;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Redacted session token type.
pub mod secret_string;
/// Utility functions for timestamps and log formatting.
pub mod utils;
/// Configuration validation types for implementation config tables.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use filter::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::{SecretString, SessionToken};
pub use utils::{deserialize_id, parse_timestamp, truncate_id};
pub use validation::*;
