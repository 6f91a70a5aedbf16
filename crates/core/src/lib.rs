//! Souk Core - Shared types library.
//!
//! This crate provides common types used across Souk components:
//! - `storefront` - Public-facing multi-tenant e-commerce site
//! - `integration-tests` - End-to-end tests against a scripted backend
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, and fulfillment

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
