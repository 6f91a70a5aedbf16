//! Souk storefront library.
//!
//! Server-rendered multi-tenant storefront over the Souk commerce API. The
//! heart of the crate is [`cart::CartEngine`], the optimistic cart
//! synchronization engine; everything else is the HTTP surface around it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod filters;
pub mod identity;
pub mod middleware;
pub mod routes;
pub mod state;
