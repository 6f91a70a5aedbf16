//! Core types for Souk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod fulfillment;
pub mod id;
pub mod money;

pub use fulfillment::FulfillmentMethod;
pub use id::*;
pub use money::Money;
