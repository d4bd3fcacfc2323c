//! Scancart Core - Shared types library.
//!
//! This crate provides common types used across the scancart workspace:
//! - `client` - The shopping-assistant engine (identity, cart, scanning)
//! - `integration-tests` - End-to-end scenario tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere,
//! including inside platform adapters.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, and user roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
