//! Common types module for the order submission wizard.
//!
//! This module defines the domain types shared by every crate in the workspace:
//! the order parameters that drive pricing, the pricing catalog and its default
//! tables, the price breakdown, the draft submission record, and the events a
//! wizard session publishes. Keeping them in one place ensures the local price
//! estimate and the persisted draft speak the same language.

/// Pricing catalog, its entries and the static default tables.
pub mod catalog;
/// Session events published while a wizard session runs.
pub mod events;
/// Money representation and rounding.
pub mod money;
/// Order parameters and the enums that drive pricing.
pub mod order;
/// Price breakdown and promo discount descriptors.
pub mod pricing;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Storage keys for persisted collections.
pub mod storage;
/// Draft submission record, partial updates and step payloads.
pub mod submission;
/// Utility functions shared across crates.
pub mod utils;
/// Configuration validation types for implementation-specific sections.
pub mod validation;

pub use catalog::*;
pub use events::*;
pub use money::{round2, Money};
pub use order::*;
pub use pricing::*;
pub use registry::ImplementationRegistry;
pub use storage::*;
pub use submission::*;
pub use utils::{
	current_timestamp, deserialize_double_option, deserialize_known_keys, truncate_id,
};
pub use validation::*;
